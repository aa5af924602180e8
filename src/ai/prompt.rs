use super::{AiVulnerabilityType, AnalysisOptions, RecommendationCategory};
use strum::IntoEnumIterator;

/// System prompt shared by every model
pub const SYSTEM_PROMPT: &str = "You are a smart contract security auditor. \
Respond with a single JSON object that follows the requested schema exactly. \
Do not add prose outside the JSON.";

/// Build the analysis prompt for one contract
pub fn build_analysis_prompt(source_code: &str, name: &str, options: &AnalysisOptions) -> String {
    let types: Vec<String> = AiVulnerabilityType::iter().map(|t| t.to_string()).collect();
    let categories: Vec<String> = RecommendationCategory::iter()
        .map(|c| c.to_string())
        .collect();

    let language = options.language.as_deref().unwrap_or("unknown");
    let focus = if options.focus_areas.is_empty() {
        String::new()
    } else {
        format!(
            "\nPay particular attention to: {}.\n",
            options.focus_areas.join(", ")
        )
    };

    format!(
        r#"Audit the following {language} contract `{name}` deployed on the {platform} platform.
{focus}
```{language}
{source_code}
```

Respond with JSON of this shape:
{{
  "vulnerabilities": [
    {{
      "type": one of [{types}],
      "severity": one of ["critical", "high", "medium", "low", "informational"],
      "title": "short title",
      "description": "what is wrong and how it can be exploited",
      "location": {{ "line": <1-based line>, "column": <1-based column> }},
      "recommendation": "how to fix it",
      "confidence": <number between 0 and 1>
    }}
  ],
  "recommendations": [
    {{
      "category": one of [{categories}],
      "priority": one of ["high", "medium", "low"],
      "description": "recommendation",
      "implementation": "concrete change"
    }}
  ],
  "quality_metrics": {{
    "code_quality_score": <0-100>,
    "maintainability_index": <0-100>,
    "test_coverage_estimate": <0-100>
  }},
  "confidence": <overall confidence between 0 and 1>
}}"#,
        language = language,
        name = name,
        platform = options.platform,
        focus = focus,
        source_code = source_code,
        types = quoted(&types),
        categories = quoted(&categories),
    )
}

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}
