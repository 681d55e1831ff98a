//! One row per transaction. Line items are aggregated, so selecting any
//! item-level figure groups the query by the transaction.

use crate::compiler::date_filter::dates_predicate;
use crate::compiler::fields::{self, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{EcommerceField, FieldId, PaymentStatus, ReportType};
use crate::sql::expr::{
    coalesce, count, json_extract, lit_float, lit_int, sum, table_col, Expr, ExprExt,
};
use crate::sql::query::JoinType;

const TRANSACTION: &str = "transaction";
const TRANSACTION_ITEM: &str = "transaction_item";
const COUPON: &str = "coupon";

fn transaction(column: &str) -> Expr {
    table_col(TRANSACTION, column)
}

fn item(column: &str) -> Expr {
    table_col(TRANSACTION_ITEM, column)
}

fn payment_predicate(status: PaymentStatus) -> Option<Expr> {
    match status {
        PaymentStatus::All => None,
        PaymentStatus::Paid => Some(transaction("paid").eq(lit_int(1))),
        PaymentStatus::Pending => Some(transaction("paid").eq(lit_int(0))),
    }
}

fn items_join(session: &mut CompileSession<'_>) {
    let table = session
        .table("ecommerce_transaction_info")
        .with_alias(TRANSACTION_ITEM);
    session.ctx.add_fanout_join_once(
        TRANSACTION_ITEM,
        JoinType::Left,
        table,
        item("id_trans").eq(transaction("id_trans")),
    );
}

fn coupon_join(session: &mut CompileSession<'_>) {
    let table = session.table("ecommerce_coupon").with_alias(COUPON);
    session.ctx.add_join_once(
        COUPON,
        JoinType::Left,
        table,
        table_col(COUPON, "id_coupon").eq(transaction("id_coupon")),
    );
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let users = session.users().await?;
    let definition = session.definition;

    let table = session.table("ecommerce_transaction").with_alias(TRANSACTION);
    session.ctx.add_from(table);
    session.ctx.add_natural_key(TRANSACTION, "id_trans");

    let user = fields::user_source(session, &users)?;
    session.ctx.add_join_once(
        USER,
        JoinType::Inner,
        user,
        table_col(USER, "idst").eq(transaction("id_user")),
    );

    session.ctx.add_where(visibility::exclude_anonymous(USER));
    if let Some(predicate) = payment_predicate(definition.ecommerce.payment_status) {
        session.ctx.add_where(predicate);
    }
    if let Some(predicate) = dates_predicate(
        &[(transaction("date_creation"), &definition.transaction_date)],
        definition.conditions,
    )? {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

fn ecommerce_field(session: &mut CompileSession<'_>, field: EcommerceField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        EcommerceField::TransactionId => transaction("id_trans"),
        EcommerceField::TransactionDate => format::datetime(transaction("date_creation"), &tz),
        EcommerceField::PaymentStatus => format::labelled(
            transaction("paid"),
            &[
                (lit_int(1), "payment_status.paid"),
                (lit_int(0), "payment_status.pending"),
            ],
            None,
            session.labels(),
        ),
        EcommerceField::PaymentMethod => transaction("payment_type"),
        EcommerceField::Currency => transaction("payment_currency"),
        EcommerceField::CouponCode => {
            coupon_join(session);
            table_col(COUPON, "code")
        }
        EcommerceField::TotalPrice => {
            items_join(session);
            coalesce(vec![sum(item("price")), lit_float(0.0)])
        }
        EcommerceField::ItemsCount => {
            items_join(session);
            count(item("id_item"))
        }
        EcommerceField::BillingCompany => {
            json_extract(transaction("billing_info"), &["company_name"])
        }
        EcommerceField::BillingVat => json_extract(transaction("billing_info"), &["vat_number"]),
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::User(f) => fields::user_field(session, f),
        FieldId::Ecommerce(f) => ecommerce_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::EcommerceTransactions,
            })
        }
    })
}
