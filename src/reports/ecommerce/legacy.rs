use tracing::warn;

use crate::legacy::{self, date, LegacyResult};
use crate::model::{
    LegacyEntity, LegacyReportDoc, LegacyVisibilityRules, PaymentStatus, ReportDefinition,
    ReportType,
};

const SCAN: &[LegacyEntity] = &[LegacyEntity::User, LegacyEntity::Ecommerce];

fn payment_status(raw: Option<&str>) -> PaymentStatus {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => PaymentStatus::All,
        Some("paid") => PaymentStatus::Paid,
        Some("pending") | Some("unpaid") => PaymentStatus::Pending,
        Some(other) => {
            warn!(status = other, "unknown legacy payment status");
            PaymentStatus::All
        }
    }
}

pub(super) fn from_legacy(
    doc: &LegacyReportDoc,
    platform: &str,
    visibility: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    let mut definition =
        legacy::base_definition(ReportType::EcommerceTransactions, doc, platform, visibility)?;
    let decoded = legacy::decode(doc)?;

    legacy::apply_users(&mut definition, &decoded);
    definition.ecommerce.payment_status =
        payment_status(decoded.filters.payment_status.as_deref());
    definition.transaction_date = date::translate(decoded.filters.start_date.as_ref());
    legacy::apply_fields_and_order(&mut definition, &decoded, SCAN);
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateFilterType, EcommerceField, FieldId};

    fn doc(filter_data: &str) -> LegacyReportDoc {
        LegacyReportDoc {
            id: 80,
            report_type_id: 8,
            name: "Sales".into(),
            author_id: None,
            creation_date: None,
            last_edit_by: None,
            last_edit_date: None,
            is_standard: false,
            filter_data: filter_data.into(),
            visibility: None,
        }
    }

    #[test]
    fn test_payment_status_and_transaction_date() {
        let data = r#"{
            "fields": {"ecommerce": ["total_price", "coupon_code"], "user": ["email"]},
            "filters": {
                "payment_status": "paid",
                "start_date": {"type": "range", "data": {"from": "2021-01-01", "to": "2021-06-30"}}
            }
        }"#;
        let def = from_legacy(&doc(data), "acme", None).unwrap();
        assert_eq!(def.ecommerce.payment_status, PaymentStatus::Paid);
        assert_eq!(def.transaction_date.filter_type, DateFilterType::Range);
        let keys: Vec<String> = def.fields.iter().map(|f| f.key()).collect();
        assert_eq!(
            keys,
            vec![
                "ecommerce_transaction_id",
                "user_email",
                "ecommerce_total_price",
                "ecommerce_coupon_code"
            ]
        );
        assert_eq!(
            def.fields.first(),
            Some(&FieldId::Ecommerce(EcommerceField::TransactionId))
        );
    }

    #[test]
    fn test_payment_status_values() {
        assert_eq!(payment_status(None), PaymentStatus::All);
        assert_eq!(payment_status(Some(" pending ")), PaymentStatus::Pending);
        assert_eq!(payment_status(Some("refunded")), PaymentStatus::All);
    }
}
