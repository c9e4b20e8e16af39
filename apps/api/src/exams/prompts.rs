// Prompt constants for LLM-backed question generation.

/// System prompt for question generation. Enforces JSON-only output.
pub const QUESTION_GENERATION_SYSTEM: &str = "You are a senior technical interviewer writing \
    screening exams for job candidates. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Question generation prompt template.
/// Replace: {count}, {title}, {description}, {responsibilities}, {requirements}, {skills_json}
pub const QUESTION_GENERATION_TEMPLATE: &str = r#"Write {count} distinct exam questions for candidates applying to the role below.

ROLE TITLE: {title}
DESCRIPTION: {description}
RESPONSIBILITIES: {responsibilities}
REQUIREMENTS: {requirements}
REQUIRED SKILLS: {skills_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "questions": [
    {
      "text": "Which SQL clause filters rows after aggregation?",
      "type": "multiple_choice",
      "options": ["WHERE", "HAVING", "GROUP BY", "ORDER BY"],
      "correct_answer": "HAVING"
    },
    {
      "text": "Describe how you would design an idempotent ingestion job.",
      "type": "open_ended",
      "correct_answer": null
    }
  ]
}

HARD RULES:
1. Return exactly {count} questions, each with different wording
2. "type" is either "multiple_choice" or "open_ended"
3. multiple_choice questions have 3 to 5 options and "correct_answer" is copied verbatim from "options"
4. Roughly two thirds multiple_choice, one third open_ended
5. Every question tests one of the required skills or requirements above
6. Do NOT use "All of the above" or "None of the above""#;
