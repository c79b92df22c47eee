//! The fixed instruction sent to the generation service for every chunk.

use crate::quiz::QuizResult;

/// Build the generation prompt for one chunk.
///
/// `difficulty` is passed through verbatim.
pub fn build_prompt(chunk: &str, num_questions: usize, difficulty: &str) -> String {
    format!(
        r#"You are an expert teacher and quiz designer.
From the study material below, generate {num_questions} multiple choice questions.

Requirements:
- 4 options per question
- Only 1 correct answer per question
- Difficulty level: {difficulty}
- Focus on key concepts, definitions, and cause-effect relationships
- For each option include is_correct (true/false) and explanation (why correct or why wrong)

Return ONLY valid JSON with no extra text, no markdown, no code fences:
{{
  "questions": [
    {{
      "question": "question text here",
      "concept_summary": "one-sentence summary of the concept being tested",
      "options": [
        {{"text": "option text", "is_correct": true,  "explanation": "why this is correct"}},
        {{"text": "option text", "is_correct": false, "explanation": "why this is wrong"}},
        {{"text": "option text", "is_correct": false, "explanation": "why this is wrong"}},
        {{"text": "option text", "is_correct": false, "explanation": "why this is wrong"}}
      ]
    }}
  ]
}}

The reply must validate against this JSON schema:
{schema}

Study Material:
{chunk}"#,
        schema = QuizResult::schema_json(),
    )
}
