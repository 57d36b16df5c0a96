// Prompt templates for AI-assisted triage of probe results

use crate::error::{Result, ScanError};
use crate::result::TargetResult;

/// First-look analysis built only from the initial response.
pub fn passive_scan_prompt(result: &TargetResult) -> String {
    format!(
        "You are an expert penetration tester. Analyze the following initial reconnaissance data for the target '{}'. \
         Identify likely technologies, interesting headers, and potential attack surfaces based *only* on this initial response. \
         Provide a concise summary.\n\n\
         --- Data ---\n\
         Status Code: {}\n\
         Technologies: {}\n\
         Response Headers:\n{}",
        result.target,
        result.status_code,
        result.technologies.join(", "),
        result.headers,
    )
}

/// A prioritised testing plan over the discovered endpoints.
pub fn active_scan_prompt(result: &TargetResult) -> String {
    format!(
        "You are an expert penetration tester. Your task is to analyze the provided web asset ('{}') and its discovered endpoints to create a prioritized testing plan. Think step-by-step like a hacker.\n\n\
         1. **Initial Hypothesis:** Based on the target name and its endpoints, what is the likely purpose of this application?\n\
         2. **Endpoint Analysis:** Review this list of discovered endpoints. Which 3-5 endpoints are the most interesting to attack? Why? (e.g., API routes, admin paths, file uploads).\n   \
            - Endpoints: {}\n\
         3. **Vulnerability Hypothesis:** For the most interesting endpoints you identified, what specific, high-impact vulnerabilities would you test for first? (e.g., for '/api/users/{{id}}', test for IDOR; for '/login', test for SQLi).\n\
         4. **Raise Questions:** What are two critical questions you would seek to answer next to confirm a vulnerability?\n\
         5. **Final Summary:** Provide a concise summary of the top 2 most likely attack vectors for this target.",
        result.target,
        result.endpoints.join(", "),
    )
}

/// Answer a user question against the full report of one target.
pub fn custom_scan_prompt(target: &str, report: &str, question: &str) -> Result<String> {
    if question.trim().is_empty() {
        return Err(ScanError::Provider(
            "Custom prompt cannot be empty".to_string(),
        ));
    }

    Ok(format!(
        "You are an expert penetration tester. Analyze the following security report for the target '{}' and then answer the user's specific question. Provide a concise, expert-level answer.\n\n\
         --- Full Security Report ---\n\
         {}\n\n\
         --- End of Report ---\n\n\
         --- User's Question ---\n\
         {}",
        target, report, question,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TargetResult {
        let mut result = TargetResult::new("api.example.com");
        result.status_code = 200;
        result.technologies = vec!["Nginx".to_string(), "PHP".to_string()];
        result.headers = "server: nginx\n".to_string();
        result.endpoints = vec![
            "https://api.example.com/v1/users".to_string(),
            "https://api.example.com/login".to_string(),
        ];
        result
    }

    #[test]
    fn test_passive_prompt_contains_recon_data() {
        let prompt = passive_scan_prompt(&sample());
        assert!(prompt.contains("'api.example.com'"));
        assert!(prompt.contains("Status Code: 200"));
        assert!(prompt.contains("Technologies: Nginx, PHP"));
        assert!(prompt.contains("Response Headers:\nserver: nginx"));
    }

    #[test]
    fn test_active_prompt_lists_endpoints() {
        let prompt = active_scan_prompt(&sample());
        assert!(prompt.contains(
            "Endpoints: https://api.example.com/v1/users, https://api.example.com/login"
        ));
        assert!(prompt.contains("'/api/users/{id}'"));
    }

    #[test]
    fn test_custom_prompt_requires_question() {
        assert!(custom_scan_prompt("t", "report", "   ").is_err());

        let prompt = custom_scan_prompt("t", "Status: 200", "Is this exploitable?").unwrap();
        assert!(prompt.contains("--- Full Security Report ---\nStatus: 200"));
        assert!(prompt.ends_with("--- User's Question ---\nIs this exploitable?"));
    }
}
