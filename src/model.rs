use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub exam: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Test {
    pub fn total_marks(&self) -> f64 {
        self.questions.iter().map(|q| q.max_marks as f64).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub category: String,
    pub max_marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
    /// Cached by the submission side; shown as-is in the info box.
    #[serde(default)]
    pub total_marks: f64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub marks_awarded: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll_num: Option<String>,
}

pub fn student_display_name(student: Option<&Student>, answer: &StudentAnswer) -> String {
    let from_student = student
        .map(|s| s.name.trim().to_string())
        .filter(|s| !s.is_empty());
    let from_answer = answer
        .student_name
        .as_deref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    from_student
        .or(from_answer)
        .unwrap_or_else(|| "student".to_string())
}
