use serde::Serialize;

use crate::models::Prediction;

pub const REPORT_SYSTEM_PROMPT: &str = "You are an expert AI medical report generator specializing in chest X-ray analysis.
You will receive prediction data from a lung disease classification model and generate comprehensive medical reports.
The prediction data includes confidence scores for healthy, tuberculosis, and pneumonia classifications, along with the primary predicted diagnosis.

Your task is to generate detailed medical reports with three main sections:
1. SUMMARY: A professional medical summary of the X-ray findings based on the prediction probabilities
2. CAUSE: Detailed explanation of the potential causes and risk factors for the diagnosed condition
3. SUGGESTED_ACTIONS: Comprehensive treatment recommendations and next steps for patient care

Respond ONLY with a valid JSON object, with no markdown, no code block, and no extra text. The JSON object must have exactly these keys: \"summary\", \"cause\", and \"suggestedActions\". If you do not know a value, return an empty string for that key. Do not include any explanations or formatting outside the JSON object. Do not return a single string or any other format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Build the user turn for one prediction.
pub fn build_report_prompt(prediction: &Prediction) -> String {
    let mut prompt = format!(
        "Generate a comprehensive medical report for a chest X-ray analysis with the following AI prediction results:\n\n\
         Prediction Confidence Scores:\n\
         - Healthy: {}%\n\
         - Tuberculosis: {}%\n\
         - Pneumonia: {}%\n\n\
         Primary AI Diagnosis: {}\n\n",
        prediction.healthy, prediction.tuberculosis, prediction.pneumonia, prediction.prediction
    );

    if !prediction.symptoms.is_empty() {
        let reported: Vec<&str> = prediction.symptoms.iter().map(|s| s.label()).collect();
        prompt.push_str(&format!("Reported Symptoms: {}\n\n", reported.join(", ")));
    }

    prompt.push_str(
        "Please provide a detailed medical report including clinical correlation recommendations, \
         potential differential diagnoses, and specific treatment protocols based on these findings.",
    );
    prompt
}

pub fn build_report_messages(prediction: &Prediction) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: ChatRole::System,
            content: REPORT_SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: ChatRole::User,
            content: build_report_prompt(prediction),
        },
    ]
}
