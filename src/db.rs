use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{PointTransaction, Role, StaffRecord, StudentRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn load_staff(pool: &PgPool, staff_id: Uuid) -> anyhow::Result<Option<StaffRecord>> {
    let row = sqlx::query(
        "SELECT id, school_id, full_name, role, grade FROM points_ledger.staff WHERE id = $1",
    )
    .bind(staff_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let raw_role: String = row.get("role");
    let role = Role::parse(&raw_role)
        .with_context(|| format!("staff {staff_id} has unrecognized role {raw_role:?}"))?;

    Ok(Some(StaffRecord {
        id: row.get("id"),
        school_id: row.get("school_id"),
        full_name: row.get("full_name"),
        role,
        grade: row.get("grade"),
    }))
}

pub async fn fetch_students(
    pool: &PgPool,
    school_id: Uuid,
) -> anyhow::Result<Vec<StudentRecord>> {
    let rows = sqlx::query(
        "SELECT id, school_id, full_name, grade FROM points_ledger.students \
         WHERE school_id = $1 ORDER BY full_name, id",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StudentRecord {
            id: row.get("id"),
            school_id: row.get("school_id"),
            full_name: row.get("full_name"),
            grade: row.get("grade"),
        })
        .collect())
}

/// Staff names for the school, used as the actor-ranking roster.
pub async fn fetch_staff_names(pool: &PgPool, school_id: Uuid) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT full_name FROM points_ledger.staff \
         WHERE school_id = $1 ORDER BY full_name, id",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("full_name")).collect())
}

pub async fn fetch_school_name(
    pool: &PgPool,
    school_id: Uuid,
) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT name FROM points_ledger.schools WHERE id = $1")
        .bind(school_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("name")))
}

pub async fn fetch_student_name(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT full_name FROM points_ledger.students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("full_name")))
}

/// Reads the ledger for one school within `[from, until)`, optionally
/// restricted to a set of subjects. The analytics core never writes through
/// this path.
pub async fn fetch_transactions(
    pool: &PgPool,
    school_id: Uuid,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    subject_ids: Option<&[Uuid]>,
) -> anyhow::Result<Vec<PointTransaction>> {
    let mut query = String::from(
        "SELECT id, school_id, form_id, category, actor_id, actor_name, \
         subject_id, subject_name, points, occurred_at, recorded_at \
         FROM points_ledger.point_transactions \
         WHERE school_id = $1 AND occurred_at >= $2 AND occurred_at < $3",
    );
    if subject_ids.is_some() {
        query.push_str(" AND subject_id = ANY($4)");
    }
    query.push_str(" ORDER BY occurred_at, recorded_at");

    let mut rows = sqlx::query(&query).bind(school_id).bind(from).bind(until);
    if let Some(ids) = subject_ids {
        rows = rows.bind(ids.to_vec());
    }

    let records = rows.fetch_all(pool).await?;
    let mut transactions = Vec::with_capacity(records.len());

    for row in records {
        transactions.push(PointTransaction {
            id: row.get("id"),
            school_id: row.get("school_id"),
            form_id: row.get("form_id"),
            category: row.get("category"),
            actor_id: row.get("actor_id"),
            actor_name: row.get("actor_name"),
            subject_id: row.get("subject_id"),
            subject_name: row.get("subject_name"),
            points: row.get("points"),
            occurred_at: row.get("occurred_at"),
            recorded_at: row.get("recorded_at"),
        });
    }

    Ok(transactions)
}

/// Irreversible bulk delete of a school's ledger and student roster.
/// Confirmation is checked by the caller before this runs.
pub async fn roster_reset(pool: &PgPool, school_id: Uuid) -> anyhow::Result<(u64, u64)> {
    let transactions =
        sqlx::query("DELETE FROM points_ledger.point_transactions WHERE school_id = $1")
            .bind(school_id)
            .execute(pool)
            .await?
            .rows_affected();
    let students = sqlx::query("DELETE FROM points_ledger.students WHERE school_id = $1")
        .bind(school_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok((transactions, students))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let school_id = Uuid::parse_str("6f1a2b3c-4d5e-4f60-8a71-92b3c4d5e6f7")?;
    sqlx::query(
        r#"
        INSERT INTO points_ledger.schools (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(school_id)
    .bind("Northgate Elementary")
    .execute(pool)
    .await?;

    let staff = vec![
        (
            Uuid::parse_str("1b9e8d7c-6a5b-4c3d-9e2f-1a0b9c8d7e6f")?,
            "Robin Hale",
            "admin",
            None::<i32>,
        ),
        (
            Uuid::parse_str("2c8d7e6f-5a4b-4c3d-8e1f-2b0a9c8d7e6f")?,
            "Dana Whitfield",
            "teacher",
            Some(5),
        ),
        (
            Uuid::parse_str("3d7c6e5f-4a3b-4c2d-7e0f-3c1b0a9d8e7f")?,
            "Lee Tran",
            "teacher",
            None,
        ),
    ];

    for (id, name, role, grade) in staff {
        sqlx::query(
            r#"
            INSERT INTO points_ledger.staff (id, school_id, full_name, role, grade)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, role = EXCLUDED.role, grade = EXCLUDED.grade
            "#,
        )
        .bind(id)
        .bind(school_id)
        .bind(name)
        .bind(role)
        .bind(grade)
        .execute(pool)
        .await?;
    }

    let students = vec![
        (
            Uuid::parse_str("4e6f5d4c-3b2a-4190-8e7f-4d2c1b0a9f8e")?,
            "Milo Andersen",
            5,
        ),
        (
            Uuid::parse_str("5f7e6d5c-4b3a-4201-9f8e-5e3d2c1b0a9f")?,
            "Priya Nair",
            5,
        ),
        (
            Uuid::parse_str("6a8f7e6d-5c4b-4312-8a9f-6f4e3d2c1b0a")?,
            "Sam Okafor",
            6,
        ),
    ];

    for (id, name, grade) in students {
        sqlx::query(
            r#"
            INSERT INTO points_ledger.students (id, school_id, full_name, grade)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, grade = EXCLUDED.grade
            "#,
        )
        .bind(id)
        .bind(school_id)
        .bind(name)
        .bind(grade)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let transactions = vec![
        ("seed-001", "Dana Whitfield", "Milo Andersen", "award", 10_i64, 2_i64),
        ("seed-002", "Dana Whitfield", "Priya Nair", "award", 20, 5),
        ("seed-003", "Lee Tran", "Sam Okafor", "award", 8, 9),
        // Legacy signed deduction; the aggregator normalizes the magnitude.
        ("seed-004", "Robin Hale", "Milo Andersen", "deduct", -5, 12),
        ("seed-005", "Dana Whitfield", "Priya Nair", "withdraw", 4, 20),
        ("seed-006", "Lee Tran", "Milo Andersen", "feedback", 0, 25),
        // Sentinel category observed in real ledgers; must not break rollups.
        ("seed-007", "Robin Hale", "Sam Okafor", "N/A", 3, 40),
        ("seed-008", "Dana Whitfield", "Milo Andersen", "award", 15, 70),
    ];

    for (source_key, actor_name, subject_name, category, points, days_ago) in transactions {
        let actor_id: Uuid = sqlx::query(
            "SELECT id FROM points_ledger.staff WHERE school_id = $1 AND full_name = $2",
        )
        .bind(school_id)
        .bind(actor_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let subject_id: Uuid = sqlx::query(
            "SELECT id FROM points_ledger.students WHERE school_id = $1 AND full_name = $2",
        )
        .bind(school_id)
        .bind(subject_name)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO points_ledger.point_transactions
            (id, school_id, form_id, category, actor_id, actor_name,
             subject_id, subject_name, points, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(school_id)
        .bind(Uuid::parse_str("7b9f8e7d-6c5b-4423-9b0a-7a5f4e3d2c1b")?)
        .bind(category)
        .bind(actor_id)
        .bind(actor_name)
        .bind(subject_id)
        .bind(subject_name)
        .bind(points)
        .bind(now - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        school_name: String,
        actor_name: String,
        subject_name: String,
        subject_grade: i32,
        category: String,
        points: i64,
        occurred_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        let school_id: Uuid = sqlx::query(
            r#"
            INSERT INTO points_ledger.schools (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.school_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let actor_id = find_or_create_staff(pool, school_id, &row.actor_name).await?;
        let subject_id =
            find_or_create_student(pool, school_id, &row.subject_name, row.subject_grade).await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let occurred_at = row.occurred_at.and_time(NaiveTime::MIN).and_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO points_ledger.point_transactions
            (id, school_id, form_id, category, actor_id, actor_name,
             subject_id, subject_name, points, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(school_id)
        .bind(Uuid::new_v4())
        .bind(&row.category)
        .bind(actor_id)
        .bind(&row.actor_name)
        .bind(subject_id)
        .bind(&row.subject_name)
        .bind(row.points)
        .bind(occurred_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn find_or_create_staff(
    pool: &PgPool,
    school_id: Uuid,
    full_name: &str,
) -> anyhow::Result<Uuid> {
    let existing = sqlx::query(
        "SELECT id FROM points_ledger.staff WHERE school_id = $1 AND full_name = $2",
    )
    .bind(school_id)
    .bind(full_name)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = existing {
        return Ok(row.get("id"));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO points_ledger.staff (id, school_id, full_name, role) \
         VALUES ($1, $2, $3, 'teacher')",
    )
    .bind(id)
    .bind(school_id)
    .bind(full_name)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn find_or_create_student(
    pool: &PgPool,
    school_id: Uuid,
    full_name: &str,
    grade: i32,
) -> anyhow::Result<Uuid> {
    let existing = sqlx::query(
        "SELECT id FROM points_ledger.students WHERE school_id = $1 AND full_name = $2",
    )
    .bind(school_id)
    .bind(full_name)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = existing {
        return Ok(row.get("id"));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO points_ledger.students (id, school_id, full_name, grade) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(school_id)
    .bind(full_name)
    .bind(grade)
    .execute(pool)
    .await?;
    Ok(id)
}
