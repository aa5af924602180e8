//! Line-oriented regex checks run alongside each platform's static tool

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::models::{
    ContractInput, Location, PlatformFamily, PlatformVulnerability, Severity, VulnerabilitySource,
};

/// A single heuristic rule
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub id: &'static str,
    pub vuln_type: &'static str,
    pub pattern: &'static str,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
    pub confidence: f64,
}

/// A rule with its compiled regex
#[derive(Debug)]
pub struct PatternCheck {
    pub rule: PatternRule,
    regex: Regex,
}

impl PatternCheck {
    fn compile(rule: PatternRule) -> Option<Self> {
        match Regex::new(rule.pattern) {
            Ok(regex) => Some(Self { rule, regex }),
            Err(err) => {
                log::error!("Invalid pattern for rule {}: {}", rule.id, err);
                None
            }
        }
    }
}

const SOLIDITY_RULES: &[PatternRule] = &[
    PatternRule {
        id: "sol-tx-origin",
        vuln_type: "access_control",
        pattern: r"\btx\.origin\b",
        severity: Severity::High,
        title: "Authorization through tx.origin",
        description: "tx.origin is the externally owned account that started the transaction; \
                      any contract it calls can impersonate it.",
        recommendation: "Use msg.sender for authorization checks.",
        confidence: 0.8,
    },
    PatternRule {
        id: "sol-delegatecall",
        vuln_type: "access_control",
        pattern: r"\.delegatecall\s*\(",
        severity: Severity::High,
        title: "delegatecall to a possibly untrusted target",
        description: "delegatecall runs foreign code against this contract's storage.",
        recommendation: "Restrict delegatecall targets to trusted, immutable addresses.",
        confidence: 0.6,
    },
    PatternRule {
        id: "sol-selfdestruct",
        vuln_type: "access_control",
        pattern: r"\b(selfdestruct|suicide)\s*\(",
        severity: Severity::High,
        title: "Contract can self-destruct",
        description: "A reachable selfdestruct removes the contract and forwards its balance.",
        recommendation: "Remove selfdestruct or guard it with strict access control.",
        confidence: 0.6,
    },
    PatternRule {
        id: "sol-timestamp",
        vuln_type: "timestamp_dependence",
        pattern: r"\b(block\.timestamp|now)\b",
        severity: Severity::Low,
        title: "Dependence on block timestamp",
        description: "Block timestamps can be skewed by block producers within bounds.",
        recommendation: "Avoid using timestamps for randomness or tight deadlines.",
        confidence: 0.4,
    },
    PatternRule {
        id: "sol-low-level-call",
        vuln_type: "unchecked_call",
        pattern: r"\.call\s*(\{[^}]*\})?\s*\(",
        severity: Severity::Medium,
        title: "Low-level call",
        description: "Low-level calls do not revert on failure and hand control to the callee.",
        recommendation: "Check the returned success flag and update state before the call.",
        confidence: 0.5,
    },
];

const AIKEN_RULES: &[PatternRule] = &[
    PatternRule {
        id: "ak-todo",
        vuln_type: "logic_error",
        pattern: r"\btodo\b",
        severity: Severity::Medium,
        title: "Unfinished validator logic",
        description: "A todo placeholder fails at runtime and leaves the validator incomplete.",
        recommendation: "Replace todo with the intended validation logic.",
        confidence: 0.7,
    },
    PatternRule {
        id: "ak-always-true",
        vuln_type: "access_control",
        pattern: r"^\s*True\s*$",
        severity: Severity::High,
        title: "Validator branch always succeeds",
        description: "A branch that always evaluates to True lets anyone spend the output.",
        recommendation: "Check signatories, datum and redeemer before returning True.",
        confidence: 0.5,
    },
    PatternRule {
        id: "ak-trace-if-false",
        vuln_type: "best_practice",
        pattern: r"\?\s*$",
        severity: Severity::Informational,
        title: "Trace-if-false operator",
        description: "The ? operator adds traces that increase script size and cost.",
        recommendation: "Build with traces disabled for production validators.",
        confidence: 0.3,
    },
];

const MOVE_RULES: &[PatternRule] = &[
    PatternRule {
        id: "move-magic-abort",
        vuln_type: "best_practice",
        pattern: r"\babort\s+\d+",
        severity: Severity::Informational,
        title: "Abort with a magic number",
        description: "Numeric abort codes are hard to trace back to their cause.",
        recommendation: "Declare named error constants and abort with them.",
        confidence: 0.5,
    },
    PatternRule {
        id: "move-public-friend",
        vuln_type: "access_control",
        pattern: r"\bpublic\s*\(\s*friend\s*\)",
        severity: Severity::Low,
        title: "Friend visibility",
        description: "public(friend) functions are callable by every declared friend module.",
        recommendation: "Prefer package visibility and keep the friend list minimal.",
        confidence: 0.4,
    },
    PatternRule {
        id: "move-unchecked-cast",
        vuln_type: "integer_overflow",
        pattern: r"\bas\s+u(8|16|32|64)\b",
        severity: Severity::Low,
        title: "Narrowing integer cast",
        description: "Casting to a narrower integer aborts when the value does not fit.",
        recommendation: "Check bounds before casting.",
        confidence: 0.4,
    },
];

static SOLIDITY_CHECKS: Lazy<Vec<PatternCheck>> = Lazy::new(|| compile_rules(SOLIDITY_RULES));
static AIKEN_CHECKS: Lazy<Vec<PatternCheck>> = Lazy::new(|| compile_rules(AIKEN_RULES));
static MOVE_CHECKS: Lazy<Vec<PatternCheck>> = Lazy::new(|| compile_rules(MOVE_RULES));

fn compile_rules(rules: &[PatternRule]) -> Vec<PatternCheck> {
    rules.iter().copied().filter_map(PatternCheck::compile).collect()
}

/// Checks for a platform family
pub fn checks_for(family: PlatformFamily) -> &'static [PatternCheck] {
    match family {
        PlatformFamily::Evm => SOLIDITY_CHECKS.as_slice(),
        PlatformFamily::Cardano => AIKEN_CHECKS.as_slice(),
        PlatformFamily::Sui | PlatformFamily::Aptos => MOVE_CHECKS.as_slice(),
        PlatformFamily::Solana | PlatformFamily::Tezos => &[],
    }
}

/// Run checks over a contract, one finding per matching line per rule
pub fn run_pattern_checks(
    checks: &[PatternCheck],
    contract: &ContractInput,
    platform: &str,
) -> Vec<PlatformVulnerability> {
    let mut findings = Vec::new();

    for (index, line) in contract.code.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*") {
            continue;
        }

        for check in checks {
            if let Some(m) = check.regex.find(line) {
                let rule = &check.rule;
                let mut location = Location::new(&contract.filename, index + 1, m.start() + 1);
                location.length = Some(m.len());

                findings.push(
                    PlatformVulnerability::new(
                        rule.vuln_type,
                        rule.severity,
                        rule.title,
                        rule.description,
                        location,
                        rule.recommendation,
                        rule.confidence,
                        VulnerabilitySource::Static,
                        platform,
                    )
                    .with_platform_data(json!({ "rule": rule.id })),
                );
            }
        }
    }

    findings
}
