//! # Demo Shift
//!
//! Writes one reproducible trading day into a store: two cashiers, a
//! manager, a drawer session each, a handful of sales, one refund, a meal
//! voucher, a payout and the day's expenses.
//!
//! ## Alice's Shift (op-1)
//! ```text
//! ┌────────┬──────────────────────┬─────────────┬──────────┐
//! │ time   │ what                 │ tender      │ amount   │
//! ├────────┼──────────────────────┼─────────────┼──────────┤
//! │ 07:00  │ drawer opened        │ float       │  200.00  │
//! │ 09:12  │ sale, espresso beans │ cash        │  100.00  │
//! │ 10:40  │ sale, club sandwich  │ card        │   50.00  │
//! │ 12:05  │ sale, caesar salad   │ meal ticket │   30.00  │
//! │ 15:30  │ refund, beans        │ cash        │  -20.00  │
//! ├────────┴──────────────────────┴─────────────┼──────────┤
//! │ expected cash in drawer                     │  280.00  │
//! └─────────────────────────────────────────────┴──────────┘
//! ```

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::info;
use uuid::Uuid;

use tally_core::{
    CashMovementRecord, CatalogEntry, ChargeRecord, Money, OperatorId, PurchaseRecord,
    ReturnRecord, SaleRecord, TicketRedemptionRecord, Window,
};

use crate::error::{StoreError, StoreResult};
use crate::pool::Database;
use crate::repository::drawer::DrawerSession;
use crate::repository::operator::{OperatorRole, StoredOperator};

/// What [`seed_shift`] wrote, for running a report over it.
#[derive(Debug, Clone)]
pub struct DemoShift {
    pub window: Window,
    pub manager: OperatorId,
    pub cashiers: Vec<OperatorId>,
}

const CATALOG: &[(&str, &str)] = &[
    ("p-beans", "Espresso Beans 250g"),
    ("p-club", "Club Sandwich"),
    ("p-caesar", "Caesar Salad"),
    ("p-croissant", "Croissant"),
    ("p-juice", "Orange Juice"),
];

/// Seeds the trading day `date` (UTC midnight to midnight).
pub async fn seed_shift(db: &Database, date: NaiveDate) -> StoreResult<DemoShift> {
    let window = day_window(date)?;
    let start = window.start();
    let at = |hour: i64, minute: i64| start + Duration::minutes(hour * 60 + minute);

    // ===== Operators =====
    let operators = db.operators();
    for (id, name, role) in [
        ("mgr-1", "Dana", OperatorRole::Manager),
        ("op-1", "Alice", OperatorRole::Cashier),
        ("op-2", "Bruno", OperatorRole::Cashier),
    ] {
        operators
            .insert(&StoredOperator {
                id: OperatorId::new(id),
                display_name: name.to_string(),
                role,
                is_active: true,
            })
            .await?;
    }

    // ===== Catalog =====
    for (product_id, name) in CATALOG {
        db.catalog()
            .upsert(&CatalogEntry {
                product_id: product_id.to_string(),
                name: name.to_string(),
            })
            .await?;
    }

    // ===== Drawer sessions =====
    let drawer = db.drawer();
    let sessions = [("op-1", at(7, 0), 20_000), ("op-2", at(7, 30), 15_000)];
    for (operator, opened_at, float_cents) in sessions {
        drawer
            .open_session(&DrawerSession {
                id: new_id("drawer"),
                operator_id: OperatorId::new(operator),
                opened_at,
                closed_at: Some(at(19, 0)),
                opening_float: Money::from_cents(float_cents),
            })
            .await?;
    }

    // ===== Sales and returns =====
    let sales = db.sales();
    let beans_sale = new_id("sale");
    let alice = [
        (beans_sale.clone(), at(9, 12), 10_000, "cash", "p-beans"),
        (new_id("sale"), at(10, 40), 5_000, "card", "p-club"),
        (new_id("sale"), at(12, 5), 3_000, "meal_ticket", "p-caesar"),
    ];
    let bruno = [
        (new_id("sale"), at(8, 15), 450, "cash", "p-croissant"),
        (new_id("sale"), at(11, 0), 4_250, "cb", "p-club"),
        (new_id("sale"), at(16, 45), 380, "especes", "p-juice"),
    ];
    for (operator, name, rows) in [("op-1", "Alice", &alice), ("op-2", "Bruno", &bruno)] {
        for (id, occurred_at, amount, tender, product) in rows.iter() {
            sales
                .insert_sale(&SaleRecord {
                    id: id.clone(),
                    operator_id: Some(operator.to_string()),
                    operator_name: Some(name.to_string()),
                    occurred_at: Some(*occurred_at),
                    amount_cents: Some(*amount),
                    tax_cents: Some(amount / 11),
                    discount_cents: None,
                    payment_method: Some(tender.to_string()),
                    product_id: Some(product.to_string()),
                    product_name: None,
                })
                .await?;
        }
    }

    sales
        .insert_return(&ReturnRecord {
            id: new_id("return"),
            sale_id: Some(beans_sale),
            operator_id: Some("op-1".to_string()),
            operator_name: Some("Alice".to_string()),
            occurred_at: Some(at(15, 30)),
            amount_cents: Some(2_000),
            tax_cents: Some(2_000 / 11),
            payment_method: Some("cash".to_string()),
            product_id: Some("p-beans".to_string()),
            product_name: None,
        })
        .await?;

    // ===== Meal voucher =====
    db.tickets()
        .insert(&TicketRedemptionRecord {
            id: new_id("ticket"),
            operator_id: Some("op-1".to_string()),
            operator_name: Some("Alice".to_string()),
            occurred_at: Some(at(12, 5)),
            face_value_cents: Some(3_000),
            vendor_id: Some("swile".to_string()),
            vendor_name: Some("Swile".to_string()),
            commission_bps: Some(400),
        })
        .await?;

    // ===== Drawer movements =====
    drawer
        .insert_movement(&CashMovementRecord {
            id: new_id("move"),
            operator_id: Some("op-2".to_string()),
            operator_name: Some("Bruno".to_string()),
            occurred_at: Some(at(14, 0)),
            amount_cents: Some(1_500),
            direction: Some("out".to_string()),
            reason: Some("window cleaner".to_string()),
        })
        .await?;

    // ===== Store-wide expenses =====
    let expenses = db.expenses();
    expenses
        .insert_purchase(&PurchaseRecord {
            id: new_id("purchase"),
            operator_id: Some("mgr-1".to_string()),
            occurred_at: Some(at(6, 30)),
            amount_cents: Some(12_000),
            tax_cents: Some(2_000),
            supplier_name: Some("Metro".to_string()),
            invoice_ref: Some("INV-0042".to_string()),
        })
        .await?;
    expenses
        .insert_charge(&ChargeRecord {
            id: new_id("charge"),
            operator_id: Some("mgr-1".to_string()),
            occurred_at: Some(at(18, 0)),
            amount_cents: Some(4_500),
            tax_cents: Some(750),
            category: Some("electricity".to_string()),
        })
        .await?;

    info!(window = %window, "Demo shift seeded");

    Ok(DemoShift {
        window,
        manager: OperatorId::new("mgr-1"),
        cashiers: vec![OperatorId::new("op-1"), OperatorId::new("op-2")],
    })
}

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// `date` from UTC midnight to the next midnight.
pub fn day_window(date: NaiveDate) -> StoreResult<Window> {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Window::new(start, start + Duration::days(1)).map_err(|e| StoreError::Internal(e.to_string()))
}
