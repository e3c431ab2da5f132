//! Presence checks for a submitted change request.
//!
//! Header and attestation fields are always required. Each selected request
//! type additionally requires its own sub-fields. Values are only checked for
//! blankness; amounts and dates are free text.

use crate::models::request::{RequestDraft, RequestType, ATTESTATION_FIELDS, HEADER_FIELDS};

/// Returns display messages in a fixed order: header fields, attestation,
/// then each selected type in declaration order. Empty means valid.
pub fn validate(draft: &RequestDraft) -> Vec<String> {
    let mut errors = Vec::new();

    for (key, label) in HEADER_FIELDS.iter().chain(ATTESTATION_FIELDS) {
        if is_blank(draft.get(key)) {
            errors.push(format!("{} is required.", label));
        }
    }

    for request_type in RequestType::ALL {
        if !draft.is_selected(request_type) {
            continue;
        }
        for key in request_type.required_fields() {
            if is_blank(draft.get(key)) {
                errors.push(format!(
                    "Field '{}' is required because this request type is selected.",
                    key
                ));
            }
        }
    }

    errors
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_header() -> RequestDraft {
        let mut draft = RequestDraft::default();
        draft
            .set("project_name", "Project A")
            .set("unit_number", "12")
            .set("paid_amount", "1000")
            .set("buyer_name", "Buyer")
            .set("agent_name", "Agent")
            .set("agency_name", "Agency")
            .set("agent_contact", "+971 50 000 0000")
            .set("requested_by_signature", "Agent")
            .set("requested_by_date", "2024-05-01");
        draft
    }

    #[test]
    fn test_complete_header_without_types_is_valid() {
        assert!(validate(&complete_header()).is_empty());
    }

    #[test]
    fn test_empty_draft_lists_all_fixed_fields_in_order() {
        let errors = validate(&RequestDraft::default());
        assert_eq!(
            errors,
            vec![
                "Project Name is required.",
                "Unit Number is required.",
                "Paid Amount is required.",
                "Buyer Name is required.",
                "Agent Name is required.",
                "Agency Name is required.",
                "Agent Contact Number is required.",
                "Agent Signature (Requested By) is required.",
                "Requested By Date is required.",
            ]
        );
    }

    #[test]
    fn test_whitespace_only_counts_as_blank() {
        let mut draft = complete_header();
        draft.set("paid_amount", "   \t");
        assert_eq!(validate(&draft), vec!["Paid Amount is required."]);
    }

    #[test]
    fn test_selected_type_requires_sub_fields() {
        let mut draft = complete_header();
        draft
            .select(RequestType::PriceReduction)
            .set("pr_listed_price", "500000")
            .set("pr_discount_amount", "")
            .set("pr_selling_price", "450000")
            .set("pr_discount_percent", "10");

        assert_eq!(
            validate(&draft),
            vec!["Field 'pr_discount_amount' is required because this request type is selected."]
        );
    }

    #[test]
    fn test_unselected_type_sub_fields_are_ignored() {
        let mut draft = complete_header();
        draft.set("bd_units", "");
        draft.set("rf_refund_amount", "   ");
        assert!(validate(&draft).is_empty());
    }

    #[test]
    fn test_waiver_spa_dates_are_optional() {
        let mut draft = complete_header();
        draft
            .select(RequestType::WaiverLateFee)
            .set("wl_penalty_amount", "2000")
            .set("wl_waiver_amount", "2000");
        assert!(validate(&draft).is_empty());
    }

    #[test]
    fn test_type_errors_follow_declaration_order() {
        let mut draft = complete_header();
        draft
            .select(RequestType::Others)
            .select(RequestType::UnitCancellation);
        assert_eq!(
            validate(&draft),
            vec![
                "Field 'uc_amount_paid' is required because this request type is selected.",
                "Field 'others_text' is required because this request type is selected.",
            ]
        );
    }

    #[test]
    fn test_header_errors_precede_type_errors() {
        let mut draft = complete_header();
        draft.set("buyer_name", "").select(RequestType::UnitCancellation);
        let errors = validate(&draft);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Buyer Name is required.");
        assert!(errors[1].contains("uc_amount_paid"));
    }
}
