use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::listing::{ListFilter, ListQuery, Page};
use super::repo_types::{Experience, ExperienceView, ExperienceViewRow};
use crate::db::PgStore;
use crate::error::StoreError;
use crate::ids::RecordId;

/// Persistent collection of experiences.
#[async_trait]
pub trait ExperienceStore: Send + Sync {
    async fn insert(&self, experience: &Experience) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<ExperienceView>, StoreError>;

    /// `total` counts every match of the filter, not just the returned page.
    async fn list(&self, query: &ListQuery) -> Result<Page<ExperienceView>, StoreError>;
}

const SELECT_VIEW: &str = r#"
    SELECT e.id, e.company, e.role, e.year, e.verdict, e.rounds, e.problem_links,
           e.tips, e.anonymous, e.author_id, u.name AS author_name,
           u.email AS author_email, e.created_at
      FROM experiences e
      JOIN users u ON u.id = e.author_id
"#;

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    let mut sep = " WHERE ";
    if let Some(company) = &filter.company {
        qb.push(sep).push("e.company = ").push_bind(company.clone());
        sep = " AND ";
    }
    if let Some(role) = &filter.role {
        qb.push(sep).push("e.role = ").push_bind(role.clone());
    }
}

#[async_trait]
impl ExperienceStore for PgStore {
    async fn insert(&self, e: &Experience) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO experiences
                (id, company, role, year, verdict, rounds, problem_links, tips,
                 anonymous, author_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&e.id)
        .bind(&e.company)
        .bind(&e.role)
        .bind(e.year)
        .bind(e.verdict.as_str())
        .bind(&e.rounds)
        .bind(&e.problem_links)
        .bind(&e.tips)
        .bind(e.anonymous)
        .bind(&e.author_id)
        .bind(e.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<ExperienceView>, StoreError> {
        let row = sqlx::query_as::<_, ExperienceViewRow>(&format!("{SELECT_VIEW} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(ExperienceView::try_from).transpose()
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<ExperienceView>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM experiences e");
        push_filter(&mut count, &query.filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_VIEW);
        push_filter(&mut select, &query.filter);
        select
            .push(" ORDER BY ")
            .push(query.sort.order_by())
            .push(" LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build_query_as::<ExperienceViewRow>()
            .fetch_all(self.pool())
            .await?;

        let items = rows
            .into_iter()
            .map(ExperienceView::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, u64::try_from(total).unwrap_or(0), query))
    }
}
