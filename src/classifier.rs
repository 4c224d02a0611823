use tracing::debug;

use crate::models::ReportType;

const PAYEE_INDICATORS: &[&str] = &[
    "payee",
    "commission",
    "dealer",
    "fee",
    "amount",
    "payment",
    "earnings",
    "compensation",
    "bonus",
    "incentive",
    "revenue",
    "payee number",
    "dealer number",
    "agent",
    "representative",
];

const CANCELLATION_INDICATORS: &[&str] = &[
    "cancellation",
    "cancel",
    "termination",
    "refund",
    "contract",
    "policy",
    "agreement",
    "discontinuation",
    "cessation",
    "end date",
    "cancellation reason",
    "termination reason",
    "refund amount",
    "cancellation date",
    "termination date",
];

/// Strong signals worth +2 each to their family when any column contains them.
const PAYEE_BONUS_TERMS: &[&str] = &["payee", "commission"];
const CANCELLATION_BONUS_TERMS: &[&str] = &["cancellation", "refund"];
const BONUS: u32 = 2;

/// Column names shown to users when a file cannot be classified.
pub const PAYEE_HINT: &[&str] = &["Payee", "Commission", "Dealer", "Fee"];
pub const CANCELLATION_HINT: &[&str] = &["Cancellation_Reason", "Contract", "Refund_Amount"];

/// Scores behind a classification, kept so callers can explain the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub report_type: ReportType,
    pub payee_score: u32,
    pub cancellation_score: u32,
    pub matched_payee: Vec<&'static str>,
    pub matched_cancellation: Vec<&'static str>,
}

/// Indicator and column match when either contains the other.
fn indicator_matches(column: &str, indicator: &str) -> bool {
    column.contains(indicator) || indicator.contains(column)
}

fn family_score(columns: &[String], indicators: &[&'static str]) -> (u32, Vec<&'static str>) {
    let mut score = 0u32;
    let mut matched = Vec::new();
    for col in columns {
        for &indicator in indicators {
            if indicator_matches(col, indicator) {
                score += 1;
                if !matched.contains(&indicator) {
                    matched.push(indicator);
                }
            }
        }
    }
    (score, matched)
}

fn bonus(columns: &[String], terms: &[&str]) -> u32 {
    terms
        .iter()
        .filter(|term| columns.iter().any(|col| col.contains(*term)))
        .count() as u32
        * BONUS
}

pub fn score<S: AsRef<str>>(column_names: &[S]) -> Classification {
    let columns: Vec<String> = column_names
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect();

    let (mut payee_score, matched_payee) = family_score(&columns, PAYEE_INDICATORS);
    let (mut cancellation_score, matched_cancellation) =
        family_score(&columns, CANCELLATION_INDICATORS);
    payee_score += bonus(&columns, PAYEE_BONUS_TERMS);
    cancellation_score += bonus(&columns, CANCELLATION_BONUS_TERMS);

    let report_type = if payee_score > cancellation_score && payee_score >= 1 {
        ReportType::PayeeStatement
    } else if cancellation_score > payee_score && cancellation_score >= 1 {
        ReportType::Cancellation
    } else {
        ReportType::Undetermined
    };

    debug!(
        payee_score,
        cancellation_score,
        report_type = report_type.label(),
        "classified columns"
    );

    Classification {
        report_type,
        payee_score,
        cancellation_score,
        matched_payee,
        matched_cancellation,
    }
}

pub fn classify<S: AsRef<str>>(column_names: &[S]) -> ReportType {
    score(column_names).report_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payee_statement_columns() {
        let cols = ["Payee", "Dealer", "Commission", "Date"];
        let c = score(&cols);
        assert_eq!(c.report_type, ReportType::PayeeStatement);
        // payee x2, dealer x2, commission x1, plus two bonuses
        assert_eq!(c.payee_score, 9);
        // "date" sits inside three cancellation indicators
        assert_eq!(c.cancellation_score, 3);
    }

    #[test]
    fn test_payee_and_commission_alone() {
        assert_eq!(classify(&["Payee", "Commission"]), ReportType::PayeeStatement);
        assert_eq!(
            classify(&["PAYEE", "commission", "State"]),
            ReportType::PayeeStatement
        );
    }

    #[test]
    fn test_cancellation_columns() {
        let cols = ["Contract", "Cancellation_Reason", "Refund_Amount", "Date"];
        let c = score(&cols);
        assert_eq!(c.report_type, ReportType::Cancellation);
        assert_eq!(c.payee_score, 1);
        assert_eq!(c.cancellation_score, 11);
    }

    #[test]
    fn test_reason_and_refund_alone() {
        assert_eq!(
            classify(&["Cancellation_Reason", "Refund_Amount"]),
            ReportType::Cancellation
        );
    }

    #[test]
    fn test_no_matches_is_undetermined() {
        let c = score(&["Widget", "Color", "Size"]);
        assert_eq!(c.report_type, ReportType::Undetermined);
        assert_eq!((c.payee_score, c.cancellation_score), (0, 0));
        assert!(c.matched_payee.is_empty());
    }

    #[test]
    fn test_no_columns_is_undetermined() {
        let empty: [&str; 0] = [];
        assert_eq!(classify(&empty), ReportType::Undetermined);
    }

    #[test]
    fn test_tie_is_undetermined() {
        // agent +1 vs policy +1
        let c = score(&["Agent", "Policy"]);
        assert_eq!((c.payee_score, c.cancellation_score), (1, 1));
        assert_eq!(c.report_type, ReportType::Undetermined);

        // payee (2 + 2) vs refund (2 + 2)
        let c = score(&["Payee", "Refund"]);
        assert_eq!(c.payee_score, c.cancellation_score);
        assert_eq!(c.report_type, ReportType::Undetermined);
    }

    #[test]
    fn test_short_column_matches_inside_indicators() {
        // a one-letter header sits inside most indicators of both families
        let c = score(&["a"]);
        assert!(c.payee_score > 1);
        assert!(c.cancellation_score > 1);
    }

    #[test]
    fn test_bonus_stacks_with_indicator_hits() {
        let c = score(&["Commission Amount"]);
        // commission + amount + bonus
        assert_eq!(c.payee_score, 4);
        assert_eq!(c.matched_payee, vec!["commission", "amount"]);
    }

    #[test]
    fn test_column_casing_untouched() {
        let cols = vec!["Payee Number".to_string()];
        classify(&cols);
        assert_eq!(cols[0], "Payee Number");
    }
}
