//! Pattern tables driving the ranker heuristics.
//!
//! Filename tiers and declaration patterns are plain data. Another language
//! is another row here. Matching is one regex per line, no parsing.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTier {
    High,
    Medium,
    Low,
}

pub struct TierRule {
    pub tier: RoleTier,
    pub adjustment: f64,
    pub patterns: &'static [&'static str],
}

/// Checked against the lowercase file name (with extension).
pub const ROLE_TIERS: &[TierRule] = &[
    TierRule {
        tier: RoleTier::High,
        adjustment: 100.0,
        patterns: &[
            r"^(?:main|app|index|server|__main__|manage|wsgi|asgi|cli|program|startup|lib)\.[a-z0-9]+$",
            r"server",
            r"config|settings",
            r"rout(?:e|er|es|ing)",
            r"controller",
            r"service",
            r"manager",
            r"handler",
            r"middleware",
            r"gateway",
            r"(?:^|[_\-.])api(?:[_\-.]|s\.)",
        ],
    },
    TierRule {
        tier: RoleTier::Medium,
        adjustment: 50.0,
        patterns: &[
            r"model",
            r"view",
            r"component",
            r"module",
            r"schema",
            r"entity",
            r"repository",
            r"store",
        ],
    },
    TierRule {
        tier: RoleTier::Low,
        adjustment: -30.0,
        patterns: &[
            r"util",
            r"helper",
            r"common",
            r"test",
            r"spec",
            r"mock",
            r"fixture",
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Function,
    Type,
    Import,
}

pub struct DensityRule {
    pub kind: DeclKind,
    pub weight: f64,
    pub patterns: &'static [&'static str],
}

/// Each pattern is matched against a single line.
pub const DENSITY_RULES: &[DensityRule] = &[
    DensityRule {
        kind: DeclKind::Function,
        weight: 5.0,
        patterns: &[
            // python, ruby
            r"^\s*(?:async\s+)?def\s+(?:self\.)?\w+",
            // rust
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+\w+"#,
            // go, swift
            r"^\s*(?:(?:public|private|internal|fileprivate|open|static|class|override|mutating|final)\s+)*func\s+(?:\([^)]*\)\s*)?\w+",
            // kotlin
            r"^\s*(?:(?:public|private|protected|internal|override|open|suspend|inline|abstract)\s+)*fun\s+(?:<[^>]*>\s*)?[\w.]+\s*\(",
            // javascript, typescript, php
            r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|protected|static|abstract|final)\s+)*(?:async\s+)?function\s*\*?\s*&?\w*\s*\(",
            r"^\s*(?:export\s+)?(?:const|let|var)\s+\w+\s*=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>",
            // java, c#
            r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|override|virtual|async)\s+)+[\w<>\[\],.?]+\s+\w+\s*\([^;]*$",
        ],
    },
    DensityRule {
        kind: DeclKind::Type,
        weight: 10.0,
        patterns: &[
            r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|protected|internal|abstract|final|sealed|static|partial|data|open|inner|enum|annotation|pub(?:\([^)]*\))?)\s+)*(?:class|struct|interface|trait|enum|protocol|record|object)\s+\w+",
            r"^\s*type\s+\w+\s+(?:struct|interface)\b",
            r"^\s*(?:export\s+)?type\s+\w+(?:<[^>]*>)?\s*=",
        ],
    },
    DensityRule {
        kind: DeclKind::Import,
        weight: 3.0,
        patterns: &[
            r"^\s*import\s+",
            r"^\s*from\s+[\w.]+\s+import\s+",
            r"^\s*(?:pub\s+)?use\s+[\w:{\\]",
            r"^\s*(?:const|let|var)\s+[\w{}\s,]+=\s*require\s*\(",
            r#"^\s*(?:require|require_relative|require_once|include|include_once)\s*\(?\s*['"]"#,
            r"^\s*using\s+[\w.]+\s*;",
        ],
    },
];

struct CompiledTier {
    tier: RoleTier,
    adjustment: f64,
    regexes: Vec<Regex>,
}

struct CompiledDensity {
    kind: DeclKind,
    weight: f64,
    regexes: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid ranker pattern"))
        .collect()
}

lazy_static! {
    static ref TIERS: Vec<CompiledTier> = ROLE_TIERS
        .iter()
        .map(|rule| CompiledTier {
            tier: rule.tier,
            adjustment: rule.adjustment,
            regexes: compile(rule.patterns),
        })
        .collect();
    static ref DENSITY: Vec<CompiledDensity> = DENSITY_RULES
        .iter()
        .map(|rule| CompiledDensity {
            kind: rule.kind,
            weight: rule.weight,
            regexes: compile(rule.patterns),
        })
        .collect();
}

/// Which tiers a file name matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleMatch {
    pub high: bool,
    pub medium: bool,
    pub low: bool,
}

impl RoleMatch {
    pub fn is_high_priority(&self) -> bool {
        self.high
    }
}

/// Classify a file name. High and medium are exclusive (high wins);
/// low is evaluated on its own and may coexist with either.
pub fn classify_name(file_name: &str) -> RoleMatch {
    let name = file_name.to_lowercase();
    let mut role = RoleMatch::default();
    for tier in TIERS.iter() {
        if !tier.regexes.iter().any(|re| re.is_match(&name)) {
            continue;
        }
        match tier.tier {
            RoleTier::High => role.high = true,
            RoleTier::Medium => role.medium = !role.high,
            RoleTier::Low => role.low = true,
        }
    }
    role
}

/// Sum of tier adjustments for a classified name.
pub fn role_adjustment(role: &RoleMatch) -> f64 {
    TIERS
        .iter()
        .filter(|tier| match tier.tier {
            RoleTier::High => role.high,
            RoleTier::Medium => role.medium,
            RoleTier::Low => role.low,
        })
        .map(|tier| tier.adjustment)
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationCounts {
    pub functions: usize,
    pub types: usize,
    pub imports: usize,
}

impl DeclarationCounts {
    fn bump(&mut self, kind: DeclKind) {
        match kind {
            DeclKind::Function => self.functions += 1,
            DeclKind::Type => self.types += 1,
            DeclKind::Import => self.imports += 1,
        }
    }

    fn get(&self, kind: DeclKind) -> usize {
        match kind {
            DeclKind::Function => self.functions,
            DeclKind::Type => self.types,
            DeclKind::Import => self.imports,
        }
    }
}

/// Count declaration lines per kind. A line counts at most once per kind.
pub fn count_declarations(content: &str) -> DeclarationCounts {
    let mut counts = DeclarationCounts::default();
    for line in content.lines() {
        for rule in DENSITY.iter() {
            if rule.regexes.iter().any(|re| re.is_match(line)) {
                counts.bump(rule.kind);
            }
        }
    }
    counts
}

/// Weighted density score for the given counts.
pub fn density_score(counts: &DeclarationCounts) -> f64 {
    DENSITY
        .iter()
        .map(|rule| rule.weight * counts.get(rule.kind) as f64)
        .sum()
}
