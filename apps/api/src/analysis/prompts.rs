// Resume analysis prompt templates.

use crate::llm_client::prompts::{fill_template, JSON_ONLY_REMINDER};

pub const FEEDBACK_SYSTEM: &str = "\
You are an expert in ATS (Applicant Tracking System) screening and resume analysis. \
You rate resumes honestly: low scores are acceptable when the resume is weak. \
You MUST respond with valid JSON only. No markdown fences, no explanations.";

/// Schema the model must follow. Mirrors `FeedbackDocument`.
pub const FEEDBACK_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // 0-100
  ATS: {
    score: number; // how well the resume would pass an ATS, 0-100
    tips: { type: "good" | "improve"; tip: string }[]; // 3-4 tips
  };
  toneAndStyle: {
    score: number; // 0-100
    tips: { type: "good" | "improve"; tip: string; explanation: string }[]; // 3-4 tips
  };
  content: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
  structure: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
  skills: {
    score: number;
    tips: { type: "good" | "improve"; tip: string; explanation: string }[];
  };
}"#;

const FEEDBACK_PROMPT_TEMPLATE: &str = r#"Please analyze and rate the attached resume and suggest how to improve it.
Be thorough and detailed. Point out every mistake or area for improvement.
If relevant, use the job description for the role the candidate is applying to for better feedback.

Company name: {company_name}
Job title: {job_title}
Job description: {job_description}

Provide the feedback using the following format:
{feedback_format}

{json_only}"#;

/// Builds the bulk feedback instruction from the user-provided context.
pub fn build_feedback_instructions(
    company_name: &str,
    job_title: &str,
    job_description: &str,
) -> String {
    fill_template(
        FEEDBACK_PROMPT_TEMPLATE,
        &[
            ("feedback_format", FEEDBACK_FORMAT),
            ("json_only", JSON_ONLY_REMINDER),
            ("company_name", or_unspecified(company_name)),
            ("job_title", or_unspecified(job_title)),
            ("job_description", or_unspecified(job_description)),
        ],
    )
}

fn or_unspecified(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "(not provided)"
    } else {
        value
    }
}
