//! Canned reports used when the report model is unavailable and the
//! deployment has opted into offline fallback.

use crate::models::{Condition, Prediction, Report};

const HEALTHY_SUMMARY: &str = "Based on the chest X-ray analysis, the AI model has identified a high probability ({score}%) of normal findings. The imaging shows clear lung fields with normal cardiac silhouette and no evidence of significant pathology.

Key findings include:
• Clear lung fields bilaterally
• Normal cardiac silhouette
• No evidence of consolidation or infiltrates
• Normal mediastinal contours

This analysis suggests normal chest X-ray findings, though clinical correlation with patient symptoms is always recommended.";

const HEALTHY_CAUSE: &str = "Normal chest X-ray findings typically indicate:

• Absence of significant pulmonary pathology
• No evidence of infection, inflammation, or structural abnormalities
• Normal respiratory function (based on imaging alone)

However, it's important to note that:
• Normal X-rays don't rule out all respiratory conditions
• Clinical symptoms should always be considered
• Some conditions may not be visible on standard chest X-rays
• Follow-up may be needed based on clinical presentation";

const HEALTHY_ACTIONS: &str = "Recommended Actions:
1. Correlate findings with patient symptoms and clinical presentation
2. If symptoms persist despite normal X-ray, consider additional imaging (CT scan)
3. Review patient history for risk factors
4. Consider pulmonary function tests if respiratory symptoms are present

Patient Management:
• Reassure patient about normal findings
• Continue monitoring if symptoms persist
• Schedule follow-up as clinically indicated
• Provide appropriate discharge instructions

Follow-up:
• Clinical reassessment if symptoms worsen
• Consider specialist referral if symptoms persist
• Maintain routine health monitoring";

const TUBERCULOSIS_SUMMARY: &str = "Based on the chest X-ray analysis, the AI model has identified a high probability ({score}%) of tuberculosis. The imaging shows characteristic patterns consistent with mycobacterial infection affecting the pulmonary parenchyma.

Key findings include:
• Upper lobe infiltrates or cavities
• Possible mediastinal lymphadenopathy
• Signs of chronic inflammatory changes
• Potential calcifications

This analysis requires immediate clinical correlation and confirmatory testing for definitive diagnosis.";

const TUBERCULOSIS_CAUSE: &str = "Tuberculosis is caused by:

Primary Cause:
• Mycobacterium tuberculosis infection
• Airborne transmission from infected individuals
• Reactivation of latent infection

Risk Factors:
• Close contact with TB patients
• Immunocompromised status (HIV, diabetes, immunosuppressive therapy)
• Crowded living conditions
• Malnutrition
• Age (very young or elderly)
• Substance abuse

The radiological patterns observed suggest active pulmonary tuberculosis, requiring immediate isolation and treatment.";

const TUBERCULOSIS_ACTIONS: &str = "Immediate Actions:
1. ISOLATE PATIENT immediately (airborne precautions)
2. Notify public health authorities (mandatory reporting)
3. Collect sputum samples for AFB smear and culture
4. Perform tuberculin skin test or interferon-gamma release assay
5. Screen close contacts

Treatment Protocol:
• Initiate four-drug therapy (RIPE regimen)
• Directly observed therapy (DOT) recommended
• Monitor for drug resistance
• Regular follow-up chest X-rays

Patient Management:
• Strict isolation until sputum is negative
• Education about transmission prevention
• Monitoring for treatment side effects
• Nutritional support

Follow-up:
• Weekly sputum monitoring initially
• Monthly clinical assessment
• Chest X-ray at 2 months and completion
• Contact tracing and screening";

const PNEUMONIA_SUMMARY: &str = "Based on the chest X-ray analysis, the AI model has identified a high probability ({score}%) of pneumonia. The imaging shows characteristic patterns consistent with inflammatory lung disease affecting the pulmonary parenchyma.

Key findings include:
• Increased opacity in lung fields
• Possible consolidation patterns
• Signs of inflammatory response
• Potential pleural effusion

This analysis should be correlated with clinical symptoms and physical examination findings for comprehensive patient assessment.";

const PNEUMONIA_CAUSE: &str = "Pneumonia is typically caused by:

Primary Causes:
• Bacterial infections (most common: Streptococcus pneumoniae)
• Viral infections (influenza, respiratory syncytial virus)
• Fungal infections (in immunocompromised patients)
• Aspiration of foreign material

Risk Factors:
• Age (very young or elderly)
• Compromised immune system
• Chronic lung diseases
• Recent respiratory tract infection
• Smoking or alcohol abuse

The radiological patterns observed suggest an infectious etiology, though clinical correlation is essential for definitive diagnosis.";

const PNEUMONIA_ACTIONS: &str = "Immediate Actions:
1. Clinical correlation with patient symptoms (fever, cough, dyspnea)
2. Laboratory investigations (CBC, CRP, procalcitonin)
3. Sputum culture and sensitivity testing
4. Blood cultures if systemically unwell

Treatment Considerations:
• Empirical antibiotic therapy based on local guidelines
• Supportive care (oxygen therapy if hypoxemic)
• Monitor for complications
• Follow-up imaging in 48-72 hours if not improving

Patient Management:
• Assess severity using CURB-65 or PSI scores
• Consider hospitalization criteria
• Ensure adequate hydration and rest
• Patient education regarding medication compliance

Follow-up:
• Clinical reassessment in 48-72 hours
• Repeat chest X-ray if symptoms persist or worsen
• Complete antibiotic course as prescribed
• Pneumonia vaccination discussion post-recovery";

/// Template report for the prediction's declared label, with the matching
/// score filled in. Unrecognized labels get the pneumonia template.
pub fn template_report(prediction: &Prediction) -> Report {
    let (summary, cause, actions, score) = match prediction.condition() {
        Some(Condition::Healthy) => (
            HEALTHY_SUMMARY,
            HEALTHY_CAUSE,
            HEALTHY_ACTIONS,
            prediction.healthy,
        ),
        Some(Condition::Tuberculosis) => (
            TUBERCULOSIS_SUMMARY,
            TUBERCULOSIS_CAUSE,
            TUBERCULOSIS_ACTIONS,
            prediction.tuberculosis,
        ),
        Some(Condition::Pneumonia) | None => (
            PNEUMONIA_SUMMARY,
            PNEUMONIA_CAUSE,
            PNEUMONIA_ACTIONS,
            prediction.pneumonia,
        ),
    };

    Report {
        summary: summary.replace("{score}", &score.to_string()),
        cause: cause.to_string(),
        suggested_actions: actions.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_template() {
        let report = template_report(&Prediction::new(85.0, 10.0, 5.0, "Healthy"));
        assert!(report.summary.contains("(85%)"));
        assert!(report.summary.contains("normal findings"));
        assert!(report.cause.contains("Normal chest X-ray"));
        assert!(report.suggested_actions.contains("Correlate findings"));
    }

    #[test]
    fn tuberculosis_template() {
        let report = template_report(&Prediction::new(5.0, 85.0, 10.0, "Tuberculosis"));
        assert!(report.summary.contains("(85%)"));
        assert!(report.summary.contains("tuberculosis"));
        assert!(report.cause.contains("Mycobacterium tuberculosis"));
        assert!(report.suggested_actions.contains("ISOLATE PATIENT"));
    }

    #[test]
    fn pneumonia_template() {
        let report = template_report(&Prediction::new(10.0, 5.0, 85.0, "Pneumonia"));
        assert!(report.summary.contains("(85%)"));
        assert!(report.summary.contains("pneumonia"));
        assert!(report.cause.contains("Bacterial infections"));
        assert!(report.suggested_actions.contains("Clinical correlation"));
    }

    #[test]
    fn unknown_label_uses_pneumonia_template() {
        let report = template_report(&Prediction::new(10.0, 5.0, 62.5, "Unclear"));
        assert!(report.summary.contains("(62.5%)"));
        assert!(report.cause.starts_with("Pneumonia"));
    }
}
