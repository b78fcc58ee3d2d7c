use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use sea_orm::{ActiveValue, Database, DatabaseConnection, DbErr, EntityTrait};
use uuid::Uuid;

use analytics::{
    BalanceFilter, CashflowFilter, ContactFilter, ConversionError, CounterpartyRole,
    DateRangeFilter, Engine, EngineError, InsufficientData, LedgerDb, LedgerQuery, LedgerStore,
    Movement, NotFoundStage, Outcome, RoleColumn, RoleFilter, TrendScope,
    buckets::Interval,
    movements,
    projection::ProjectionOptions,
    summary::{GroupBy, RECENT_LIMIT},
    trend::TrendDirection,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn seed(db: &DatabaseConnection, rows: Vec<Movement>) {
    for row in rows {
        let model = movements::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            organization_id: ActiveValue::Set(row.organization_id),
            movement_date: ActiveValue::Set(row.movement_date),
            amount: ActiveValue::Set(row.amount),
            type_name: ActiveValue::Set(row.type_name),
            category_name: ActiveValue::Set(row.category_name),
            subcategory_name: ActiveValue::Set(row.subcategory_name),
            currency_code: ActiveValue::Set(row.currency_code),
            currency_symbol: ActiveValue::Set(row.currency_symbol),
            exchange_rate: ActiveValue::Set(row.exchange_rate),
            wallet_name: ActiveValue::Set(row.wallet_name),
            project_name: ActiveValue::Set(row.project_name),
            partner: ActiveValue::Set(row.partner),
            subcontract: ActiveValue::Set(row.subcontract),
            subcontract_contact: ActiveValue::Set(row.subcontract_contact),
            personnel: ActiveValue::Set(row.personnel),
            client: ActiveValue::Set(row.client),
            member: ActiveValue::Set(row.member),
            indirect: ActiveValue::Set(row.indirect),
            general_cost: ActiveValue::Set(row.general_cost),
        };
        movements::Entity::insert(model).exec(db).await.unwrap();
    }
}

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn ars(org: Uuid, date: &str, kind: &str, amount: f64) -> Movement {
    Movement {
        type_name: Some(kind.to_string()),
        currency_code: Some("ARS".to_string()),
        currency_symbol: Some("$".to_string()),
        exchange_rate: Some(1000.0),
        ..Movement::new(org, day(date), amount)
    }
}

fn usd(org: Uuid, date: &str, kind: &str, amount: f64) -> Movement {
    Movement {
        currency_code: Some("USD".to_string()),
        currency_symbol: Some("US$".to_string()),
        exchange_rate: Some(1.0),
        ..ars(org, date, kind, amount)
    }
}

fn scenario_a(org: Uuid) -> Vec<Movement> {
    vec![
        ars(org, "2024-01-10", "Ingreso", 1000.0),
        ars(org, "2024-01-20", "Egreso", 400.0),
        ars(org, "2024-02-05", "Ingreso", 200.0),
    ]
}

fn personnel(org: Uuid, date: &str, name: &str, project: &str, amount: f64) -> Movement {
    Movement {
        personnel: Some(name.to_string()),
        project_name: Some(project.to_string()),
        ..ars(org, date, "Egreso", amount)
    }
}

#[tokio::test]
async fn balance_sums_income_and_expenses_in_ars() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;

    let filter = BalanceFilter {
        currency: Some("ARS".to_string()),
        ..Default::default()
    };
    let summary = engine
        .organization_balance(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.currency.code, "ARS");
    assert_eq!(summary.currency.symbol.as_deref(), Some("$"));
    assert!(!summary.converted);
    assert_eq!(summary.totals.total_income, 1200.0);
    assert_eq!(summary.totals.total_expenses, 400.0);
    assert_eq!(summary.totals.balance, 800.0);
    assert_eq!(summary.totals.movement_count, 3);
}

#[tokio::test]
async fn balance_ignores_other_organizations() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    let other = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;
    seed(&db, vec![ars(other, "2024-01-11", "Ingreso", 99_999.0)]).await;

    let summary = engine
        .organization_balance(&org.to_string(), &BalanceFilter::default())
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.totals.balance, 800.0);
}

#[tokio::test]
async fn mixed_currencies_are_never_summed() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    let mut rows = scenario_a(org);
    rows.push(usd(org, "2024-02-10", "Egreso", 5.0));
    seed(&db, rows).await;

    let outcome = engine
        .organization_balance(&org.to_string(), &BalanceFilter::default())
        .await
        .unwrap();
    match outcome {
        Outcome::CurrencyAmbiguity(ambiguity) => {
            let codes: Vec<&str> = ambiguity
                .currencies
                .iter()
                .map(|currency| currency.code.as_str())
                .collect();
            assert_eq!(codes, vec!["ARS", "USD"]);
            assert_eq!(ambiguity.currencies[0].movements, 3);
            assert_eq!(ambiguity.currencies[1].movements, 1);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn conversion_uses_rates_recorded_in_scope() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            ars(org, "2024-01-10", "Ingreso", 1000.0),
            usd(org, "2024-01-12", "Egreso", 5.0),
        ],
    )
    .await;

    let filter = BalanceFilter {
        convert_to: Some("usd".to_string()),
        ..Default::default()
    };
    let summary = engine
        .organization_balance(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(summary.converted);
    assert_eq!(summary.currency.code, "USD");
    assert!((summary.totals.total_income - 1.0).abs() < 1e-9);
    assert!((summary.totals.balance + 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn conversion_without_reference_movement_is_reported() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;

    let filter = BalanceFilter {
        convert_to: Some("EUR".to_string()),
        ..Default::default()
    };
    let outcome = engine
        .organization_balance(&org.to_string(), &filter)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::ConversionFailed(ConversionError::MissingReference {
            target: "EUR".to_string(),
            available: vec!["ARS".to_string()],
        })
    );
}

#[tokio::test]
async fn zero_exchange_rate_fails_conversion() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    let mut broken = ars(org, "2024-01-10", "Ingreso", 1000.0);
    broken.exchange_rate = Some(0.0);
    seed(&db, vec![usd(org, "2024-01-11", "Ingreso", 1.0), broken]).await;

    let filter = BalanceFilter {
        convert_to: Some("USD".to_string()),
        ..Default::default()
    };
    let outcome = engine
        .organization_balance(&org.to_string(), &filter)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::ConversionFailed(ConversionError::InvalidRate { .. })
    ));
}

#[tokio::test]
async fn currency_filter_that_matches_nothing_names_its_stage() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;

    let filter = BalanceFilter {
        currency: Some("EUR".to_string()),
        ..Default::default()
    };
    match engine
        .organization_balance(&org.to_string(), &filter)
        .await
        .unwrap()
    {
        Outcome::NotFound(not_found) => assert_eq!(not_found.stage, NotFoundStage::Currency),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_ledger_and_bad_ids() {
    let (engine, _db) = engine_with_db().await;
    let org = Uuid::new_v4();

    match engine
        .organization_balance(&org.to_string(), &BalanceFilter::default())
        .await
        .unwrap()
    {
        Outcome::NotFound(not_found) => assert_eq!(not_found.stage, NotFoundStage::Ledger),
        other => panic!("expected not found, got {other:?}"),
    }

    let err = engine
        .organization_balance("organization-1", &BalanceFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn role_spending_breaks_down_by_project() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
            personnel(org, "2024-03-08", "Juan Pérez", "Casa B", 700.0),
            Movement {
                client: Some("Inmobiliaria Norte".to_string()),
                ..ars(org, "2024-03-09", "Ingreso", 9000.0)
            },
        ],
    )
    .await;

    let summary = engine
        .role_spending(&org.to_string(), &RoleFilter::new(CounterpartyRole::Personnel))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.role, CounterpartyRole::Personnel);
    assert_eq!(summary.total, 1200.0);
    assert_eq!(summary.count, 2);
    assert_eq!(summary.totals.total_expenses, 1200.0);

    let by_project = summary.by_project.unwrap();
    let breakdown: Vec<(Option<&str>, f64)> = by_project
        .iter()
        .map(|group| (group.key.as_deref(), group.subtotal))
        .collect();
    assert_eq!(
        breakdown,
        vec![(Some("Casa B"), 700.0), (Some("Casa A"), 500.0)]
    );

    assert_eq!(summary.by_counterparty.len(), 1);
    assert_eq!(summary.by_counterparty[0].key.as_deref(), Some("Juan Pérez"));
    assert_eq!(summary.by_counterparty[0].count, 2);
    assert!(summary.recent.is_none());
}

#[tokio::test]
async fn role_spending_in_one_project_has_no_breakdown() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
            personnel(org, "2024-03-08", "Juan Pérez", "Casa B", 700.0),
        ],
    )
    .await;

    let filter = RoleFilter {
        project_name: Some("casa a".to_string()),
        detail: true,
        ..RoleFilter::new(CounterpartyRole::Personnel)
    };
    let summary = engine
        .role_spending(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.total, 500.0);
    assert!(summary.by_project.is_none());
    assert_eq!(summary.recent.unwrap().items.len(), 1);
}

#[tokio::test]
async fn role_spending_skips_blank_roles_and_organization_rows() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
            Movement {
                personnel: Some("Juan Pérez".to_string()),
                ..ars(org, "2024-03-02", "Egreso", 200.0)
            },
            Movement {
                personnel: Some("   ".to_string()),
                project_name: Some("Casa B".to_string()),
                ..ars(org, "2024-03-03", "Egreso", 999.0)
            },
        ],
    )
    .await;

    let summary = engine
        .role_spending(&org.to_string(), &RoleFilter::new(CounterpartyRole::Personnel))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.total, 700.0);
    assert_eq!(summary.count, 2);
    assert!(summary.by_project.is_none());
    assert_eq!(summary.by_counterparty.len(), 1);
    assert_eq!(summary.by_counterparty[0].key.as_deref(), Some("Juan Pérez"));
}

#[tokio::test]
async fn subcontractor_matches_either_subcontract_column() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            Movement {
                subcontract: Some("Instalación eléctrica".to_string()),
                subcontract_contact: Some("Electro Sur".to_string()),
                ..ars(org, "2024-04-02", "Egreso", 300.0)
            },
            Movement {
                subcontract: Some("Pintura".to_string()),
                ..ars(org, "2024-04-03", "Egreso", 100.0)
            },
        ],
    )
    .await;

    let filter = RoleFilter {
        contact_name: Some("electro sur".to_string()),
        ..RoleFilter::new(CounterpartyRole::Subcontractor)
    };
    let summary = engine
        .role_spending(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.by_counterparty[0].key.as_deref(), Some("Electro Sur"));

    let all = engine
        .role_spending(&org.to_string(), &RoleFilter::new(CounterpartyRole::Subcontractor))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(all.total, 400.0);
}

#[tokio::test]
async fn role_spending_rejects_unknown_roles_and_reports_missing_ones() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;

    let filter = RoleFilter {
        role: "client".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        engine.role_spending(&org.to_string(), &filter).await,
        Err(EngineError::Validation(_))
    ));

    match engine
        .role_spending(&org.to_string(), &RoleFilter::new(CounterpartyRole::Partner))
        .await
        .unwrap()
    {
        Outcome::NotFound(not_found) => assert_eq!(not_found.stage, NotFoundStage::Role),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn contact_search_ors_across_role_columns() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
            Movement {
                client: Some("JUAN PEREZ".to_string()),
                project_name: Some("Casa B".to_string()),
                ..ars(org, "2024-03-05", "Ingreso", 2000.0)
            },
            personnel(org, "2024-03-06", "Ana Díaz", "Casa A", 300.0),
        ],
    )
    .await;

    let summary = engine
        .contact_movements(&org.to_string(), &ContactFilter::new("perez"))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.totals.movement_count, 2);
    assert_eq!(summary.totals.balance, 1500.0);
    let roles: Vec<RoleColumn> = summary.roles.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![RoleColumn::Personnel, RoleColumn::Client]);
}

#[tokio::test]
async fn contact_and_project_misses_are_distinguishable() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
            personnel(org, "2024-03-08", "Juan Pérez", "Casa B", 700.0),
        ],
    )
    .await;

    let contact_miss = engine
        .contact_movements(&org.to_string(), &ContactFilter::new("Maria"))
        .await
        .unwrap();
    let project_miss = engine
        .contact_movements(
            &org.to_string(),
            &ContactFilter {
                project_name: Some("Edificio Norte".to_string()),
                ..ContactFilter::new("Juan")
            },
        )
        .await
        .unwrap();

    let (Outcome::NotFound(contact), Outcome::NotFound(project)) = (contact_miss, project_miss)
    else {
        panic!("both searches should come back empty");
    };
    assert_eq!(contact.stage, NotFoundStage::Contact);
    assert_eq!(contact.detail.as_deref(), Some("Maria"));
    assert_eq!(project.stage, NotFoundStage::Project);
    assert_ne!(contact.stage, project.stage);
}

#[tokio::test]
async fn contact_movements_within_dates_converted() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-01-15", "Juan Pérez", "Casa A", 2000.0),
            Movement {
                client: Some("Juan Perez".to_string()),
                ..usd(org, "2024-02-01", "Ingreso", 5.0)
            },
            Movement {
                client: Some("Juan Perez".to_string()),
                exchange_rate: Some(1.05),
                ..usd(org, "2024-02-10", "Ingreso", 10.0)
            },
            personnel(org, "2024-03-05", "Juan Pérez", "Casa A", 9000.0),
        ],
    )
    .await;

    let filter = ContactFilter {
        start_date: Some("2024-01-01".to_string()),
        end_date: Some("2024-02-29".to_string()),
        convert_to: Some("USD".to_string()),
        detail: true,
        ..ContactFilter::new("juan perez")
    };
    let summary = engine
        .contact_movements(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(summary.converted);
    assert_eq!(summary.currency.code, "USD");
    assert_eq!(summary.totals.movement_count, 3);
    assert!((summary.totals.total_expenses - 2.0).abs() < 1e-9);
    assert!((summary.totals.total_income - 15.0).abs() < 1e-9);
    assert!((summary.totals.balance - 13.0).abs() < 1e-9);
    assert_eq!(summary.recent.unwrap().items.len(), 3);
}

#[tokio::test]
async fn contact_name_is_required() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .contact_movements(&Uuid::new_v4().to_string(), &ContactFilter::new("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn date_range_groups_and_lists_recent_movements() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    let mut rows = Vec::new();
    for n in 1..=17u32 {
        let category = if n % 2 == 0 { "Materiales" } else { "Mano de obra" };
        rows.push(Movement {
            category_name: Some(category.to_string()),
            wallet_name: Some("Caja".to_string()),
            project_name: Some("Casa A".to_string()),
            ..ars(org, &format!("2024-05-{n:02}"), "Egreso", f64::from(n) * 10.0)
        });
    }
    rows.push(ars(org, "2024-06-15", "Egreso", 1.0));
    seed(&db, rows).await;

    let filter = DateRangeFilter {
        group_by: Some(GroupBy::Category),
        detail: true,
        ..DateRangeFilter::new("2024-05-01", "2024-05-31")
    };
    let summary = engine
        .date_range_movements(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.totals.movement_count, 17);

    let groups = summary.groups.unwrap();
    assert_eq!(groups.len(), 2);
    // 10 + 30 + ... + 170 = 810, 20 + 40 + ... + 160 = 720
    assert_eq!(groups[0].key.as_deref(), Some("Mano de obra"));
    assert_eq!(groups[0].subtotal, 810.0);
    assert_eq!(groups[1].subtotal, 720.0);

    let recent = summary.recent.unwrap();
    assert_eq!(recent.items.len(), RECENT_LIMIT);
    assert_eq!(recent.omitted, 2);
    assert_eq!(recent.items[0].movement_date, day("2024-05-17"));
}

#[tokio::test]
async fn date_range_explicit_filters() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            Movement {
                category_name: Some("Materiales".to_string()),
                wallet_name: Some("Banco".to_string()),
                ..ars(org, "2024-05-02", "Egreso", 100.0)
            },
            Movement {
                category_name: Some("Materiales".to_string()),
                wallet_name: Some("Caja".to_string()),
                ..ars(org, "2024-05-03", "Egreso", 50.0)
            },
            personnel(org, "2024-05-04", "Ana", "Casa A", 70.0),
        ],
    )
    .await;

    let filter = DateRangeFilter {
        categories: vec!["materiales".to_string()],
        wallets: vec!["BANCO".to_string()],
        ..DateRangeFilter::new("2024-05-01", "2024-05-31")
    };
    let summary = engine
        .date_range_movements(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.totals.total_expenses, 100.0);

    let filter = DateRangeFilter {
        roles: vec![RoleColumn::Personnel],
        ..DateRangeFilter::new("2024-05-01", "2024-05-31")
    };
    let summary = engine
        .date_range_movements(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.totals.total_expenses, 70.0);

    let filter = DateRangeFilter {
        types: vec!["ingreso".to_string()],
        ..DateRangeFilter::new("2024-05-01", "2024-05-31")
    };
    match engine
        .date_range_movements(&org.to_string(), &filter)
        .await
        .unwrap()
    {
        Outcome::NotFound(not_found) => assert_eq!(not_found.stage, NotFoundStage::Filters),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn date_range_validates_and_reports_empty_periods() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_a(org)).await;

    let backwards = DateRangeFilter::new("2024-03-01", "2024-01-01");
    assert!(matches!(
        engine.date_range_movements(&org.to_string(), &backwards).await,
        Err(EngineError::Validation(_))
    ));

    let missing = DateRangeFilter::new("", "2024-01-01");
    assert!(matches!(
        engine.date_range_movements(&org.to_string(), &missing).await,
        Err(EngineError::Validation(_))
    ));

    let empty = DateRangeFilter::new("2023-01-01", "2023-12-31");
    match engine
        .date_range_movements(&org.to_string(), &empty)
        .await
        .unwrap()
    {
        Outcome::NotFound(not_found) => assert_eq!(not_found.stage, NotFoundStage::Period),
        other => panic!("expected not found, got {other:?}"),
    }
}

fn scenario_c(org: Uuid) -> Vec<Movement> {
    vec![
        ars(org, "2024-01-05", "Ingreso", 100.0),
        ars(org, "2024-01-25", "Egreso", 200.0),
        ars(org, "2024-02-14", "Egreso", 50.0),
        ars(org, "2024-03-01", "Ingreso", 200.0),
        ars(org, "2024-04-03", "Ingreso", 500.0),
        ars(org, "2024-04-28", "Egreso", 200.0),
    ]
}

#[tokio::test]
async fn cashflow_trend_detects_improvement() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_c(org)).await;

    let filter = CashflowFilter {
        start_date: Some("2024-01-01".to_string()),
        end_date: Some("2024-04-30".to_string()),
        ..Default::default()
    };
    let summary = engine
        .cashflow_trend(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();

    let nets: Vec<f64> = summary.periods.iter().map(|p| p.net).collect();
    assert_eq!(nets, vec![-100.0, -50.0, 200.0, 300.0]);
    assert_eq!(summary.periods[2].label, "Marzo 2024");
    assert_eq!(summary.trend.first_half_mean, -75.0);
    assert_eq!(summary.trend.second_half_mean, 250.0);
    assert_eq!(summary.trend.direction, TrendDirection::Improving);
    assert_eq!(summary.average_net_flow, 87.5);
    assert_eq!(summary.best_period.key, "2024-04");
    assert_eq!(summary.worst_period.key, "2024-01");
    assert_eq!(summary.interval, Interval::Monthly);
}

#[tokio::test]
async fn cashflow_default_window_trails_as_of() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_c(org)).await;

    let filter = CashflowFilter {
        as_of: Some("2024-04-30".to_string()),
        ..Default::default()
    };
    let summary = engine
        .cashflow_trend(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(summary.start, day("2024-02-01"));
    let keys: Vec<&str> = summary.periods.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-02", "2024-03", "2024-04"]);
}

#[tokio::test]
async fn cashflow_needs_two_periods() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(&db, scenario_c(org)).await;

    let filter = CashflowFilter {
        start_date: Some("2024-01-01".to_string()),
        end_date: Some("2024-01-31".to_string()),
        ..Default::default()
    };
    let outcome = engine
        .cashflow_trend(&org.to_string(), &filter)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::InsufficientData(InsufficientData {
            periods: 1,
            required: 2,
        })
    );
}

#[tokio::test]
async fn cashflow_weekly_in_project_scope() {
    let (engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-11", "Ana", "Casa Álamo", 100.0),
            personnel(org, "2024-03-17", "Ana", "Casa Álamo", 100.0),
            personnel(org, "2024-03-18", "Ana", "Casa Álamo", 50.0),
            personnel(org, "2024-03-19", "Ana", "Edificio Sur", 999.0),
            ars(org, "2024-03-12", "Ingreso", 5000.0),
        ],
    )
    .await;

    let filter = CashflowFilter {
        interval: Interval::Weekly,
        scope: TrendScope::Project,
        project_name: Some("casa alamo".to_string()),
        start_date: Some("2024-03-01".to_string()),
        end_date: Some("2024-03-31".to_string()),
        ..Default::default()
    };
    let summary = engine
        .cashflow_trend(&org.to_string(), &filter)
        .await
        .unwrap()
        .found()
        .unwrap();
    let keys: Vec<&str> = summary.periods.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-03-11", "2024-03-18"]);
    assert_eq!(summary.periods[0].net, -200.0);
    assert_eq!(summary.periods[0].label, "Semana del 11 al 17 de marzo de 2024");
    assert_eq!(summary.trend.direction, TrendDirection::Improving);
    assert_eq!(summary.project_name.as_deref(), Some("casa alamo"));

    let missing_name = CashflowFilter {
        scope: TrendScope::Project,
        ..Default::default()
    };
    assert!(matches!(
        engine.cashflow_trend(&org.to_string(), &missing_name).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn ledger_reads_only_projected_columns() {
    let (_engine, db) = engine_with_db().await;
    let org = Uuid::new_v4();
    seed(
        &db,
        vec![
            personnel(org, "2024-03-08", "Juan Pérez", "Casa B", 700.0),
            personnel(org, "2024-03-01", "Juan Pérez", "Casa A", 500.0),
        ],
    )
    .await;

    let store = LedgerDb::new(db);
    let rows = store
        .fetch(&LedgerQuery::new(org, &ProjectionOptions::default()))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].movement_date, day("2024-03-01"));
    assert_eq!(rows[0].amount, 500.0);
    assert_eq!(rows[0].organization_id, org);
    assert!(rows[0].project_name.is_none());
    assert!(rows[0].personnel.is_none());
    assert!(rows[0].currency_code.is_none());

    let projection = ProjectionOptions {
        project: true,
        ..Default::default()
    };
    let rows = store
        .fetch(&LedgerQuery::new(org, &projection).project_scoped())
        .await
        .unwrap();
    assert_eq!(rows[1].project_name.as_deref(), Some("Casa B"));
}

/// Store serving fixed rows and counting round-trips.
struct FixedStore {
    rows: Result<Vec<Movement>, String>,
    calls: AtomicUsize,
}

impl FixedStore {
    fn new(rows: Result<Vec<Movement>, String>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }
}

impl LedgerStore for FixedStore {
    async fn fetch(&self, _query: &LedgerQuery) -> Result<Vec<Movement>, DbErr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.clone().map_err(DbErr::Custom)
    }
}

#[tokio::test]
async fn every_report_reads_the_ledger_once() {
    let org = Uuid::new_v4();
    let engine = Engine::with_store(FixedStore::new(Ok(scenario_a(org))));
    let id = org.to_string();

    engine
        .organization_balance(&id, &BalanceFilter::default())
        .await
        .unwrap();
    engine
        .contact_movements(&id, &ContactFilter::new("nadie"))
        .await
        .unwrap();
    engine
        .role_spending(&id, &RoleFilter::new(CounterpartyRole::Partner))
        .await
        .unwrap();
    engine
        .date_range_movements(&id, &DateRangeFilter::new("2024-01-01", "2024-12-31"))
        .await
        .unwrap();
    engine
        .cashflow_trend(&id, &CashflowFilter::default())
        .await
        .unwrap();
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 5);

    // Validation happens before the store is touched.
    let _ = engine
        .date_range_movements(&id, &DateRangeFilter::new("bad", "2024-12-31"))
        .await;
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn malformed_rows_make_the_report_unavailable() {
    let org = Uuid::new_v4();
    let mut rows = scenario_a(org);
    rows[1].amount = 0.0;
    let engine = Engine::with_store(FixedStore::new(Ok(rows)));

    let outcome = engine
        .organization_balance(&org.to_string(), &BalanceFilter::default())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Unavailable);
}

#[tokio::test]
async fn store_failures_propagate() {
    let org = Uuid::new_v4();
    let engine = Engine::with_store(FixedStore::new(Err("connection reset".to_string())));

    let err = engine
        .organization_balance(&org.to_string(), &BalanceFilter::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Database(DbErr::Custom("connection reset".to_string()))
    );
}
