use crate::model::{Answer, Question, StudentAnswer, Test};

pub fn question(id: &str, subject: &str, category: &str, topic: &str, max: u32) -> Question {
    Question {
        id: id.to_string(),
        subject: subject.to_string(),
        chapter: format!("{subject} chapter"),
        topic: topic.to_string(),
        category: category.to_string(),
        max_marks: max,
        text: None,
    }
}

pub fn answer(question_id: &str, marks: f64) -> Answer {
    Answer {
        question_id: question_id.to_string(),
        marks_awarded: marks,
        selected_option_id: None,
        text_answer: None,
    }
}

pub fn test_with(questions: Vec<Question>) -> Test {
    Test {
        id: "t1".to_string(),
        name: "Mock Test 1".to_string(),
        course: "NEET".to_string(),
        batch: "Elite".to_string(),
        exam: "Mock Test".to_string(),
        date: "2025-03-14".to_string(),
        questions,
    }
}

pub fn student_answer(answers: Vec<Answer>) -> StudentAnswer {
    let total = answers.iter().map(|a| a.marks_awarded).sum();
    StudentAnswer {
        id: "sa1".to_string(),
        test_id: "t1".to_string(),
        student_id: "s1".to_string(),
        student_name: Some("Asha K".to_string()),
        date: "2025-03-14".to_string(),
        answers,
        total_marks: total,
        percentage: 0.0,
    }
}

/// Two physics questions: Factual out of 4, Reasoning out of 6.
pub fn physics_pair() -> (Test, StudentAnswer) {
    let test = test_with(vec![
        question("q1", "Physics", "Factual", "Motion in 1D", 4),
        question("q2", "Physics", "Reasoning", "Newton's Laws", 6),
    ]);
    let mut sa = student_answer(vec![answer("q1", 4.0), answer("q2", 1.0)]);
    sa.percentage = 50.0;
    (test, sa)
}
