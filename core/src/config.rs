use crate::{error::AgingError, error::AgingResult, types::Amount};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Field aliases ──────────────────────────────────────────────────

/// Upstream field names accepted for each canonical field, tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub customer_code: Vec<String>,
    pub customer_name: Vec<String>,
    pub group: Vec<String>,
    pub manager: Vec<String>,
    pub total_debt: Vec<String>,
    pub overdue_days: Vec<String>,
    pub due_date: Vec<String>,
    pub bucket_breakdown: Vec<String>,
    pub salesman_breakdown: Vec<String>,
    pub salesperson_name: Vec<String>,
    pub slice_amount: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            customer_code: names(&["customer_code", "customerCode", "code", "ma_kh"]),
            customer_name: names(&["customer_name", "customerName", "name", "ten_kh"]),
            group: names(&["group", "customer_group", "groupName", "nhom"]),
            manager: names(&["manager", "employee", "employee_name", "nvkd", "responsible"]),
            total_debt: names(&[
                "total_debt",
                "totalDebt",
                "balance",
                "closing_balance",
                "debt",
                "du_no",
                "so_du",
            ]),
            overdue_days: names(&["overdue_days", "overdueDays", "days_overdue", "qua_han"]),
            due_date: names(&["due_date", "dueDate", "han_tt"]),
            bucket_breakdown: names(&["bucket_breakdown", "bucketBreakdown", "aging", "buckets"]),
            salesman_breakdown: names(&[
                "salesman_breakdown",
                "salesmanBreakdown",
                "sales_breakdown",
                "salesmen",
            ]),
            salesperson_name: names(&["salesperson_name", "salesperson", "salesman", "name"]),
            slice_amount: names(&["amount", "debt", "total"]),
        }
    }
}

// ── Segments ───────────────────────────────────────────────────────

/// A keyword rule placing a customer in an account-type segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRule {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
}

fn default_segments() -> Vec<SegmentRule> {
    vec![SegmentRule {
        id: "state".into(),
        label: "State institution".into(),
        keywords: names(&[
            "bệnh viện",
            "trung tâm y tế",
            "sở y tế",
            "trạm y tế",
            "hospital",
            "health department",
            "ministry",
        ]),
    }]
}

// ── Employee pivot policy ──────────────────────────────────────────

/// How the by-employee pivot keys its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeKeyPolicy {
    /// Group by the record's manager.
    #[default]
    Manager,
    /// Group by the selected employee(s) the record matched.
    DisplayManager,
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_group: String,
    pub default_manager: String,
    /// Allowed gap between a bucket sum and its total.
    pub tolerance: Amount,
    /// Reporting date used to derive overdue days from a due date.
    pub as_of: Option<NaiveDate>,
    pub aliases: FieldAliases,
    pub segments: Vec<SegmentRule>,
    pub fallback_segment: String,
    pub employee_key: EmployeeKeyPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_group: "Unclassified".into(),
            default_manager: "Unassigned".into(),
            tolerance: Decimal::ONE,
            as_of: None,
            aliases: FieldAliases::default(),
            segments: default_segments(),
            fallback_segment: "private".into(),
            employee_key: EmployeeKeyPolicy::Manager,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Cannot load {path}: {e}"))?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(content: &str) -> AgingResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AgingResult<()> {
        if self.tolerance.is_sign_negative() {
            return Err(AgingError::Config {
                reason: format!("tolerance must be non-negative, got {}", self.tolerance),
            });
        }
        if self.fallback_segment.trim().is_empty() {
            return Err(AgingError::Config {
                reason: "fallback_segment must not be empty".into(),
            });
        }
        for rule in &self.segments {
            if rule.id.trim().is_empty() {
                return Err(AgingError::Config {
                    reason: format!("segment '{}' has an empty id", rule.label),
                });
            }
            if rule.id == self.fallback_segment {
                return Err(AgingError::Config {
                    reason: format!("segment '{}' collides with the fallback segment", rule.id),
                });
            }
        }
        Ok(())
    }
}
