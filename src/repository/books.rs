//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CopyCounts, CreateBook, UpdateBook},
};

use super::{contains_pattern, page_bounds};

const DUPLICATE_BARCODE: &str = "A book with this barcode already exists";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by barcode
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE barcode = $1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with barcode {} not found", barcode)))
    }

    /// Check if barcode already exists
    pub async fn barcode_exists(&self, barcode: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE barcode = $1 AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(barcode)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Number of books in the catalog
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (_, per_page, offset) = page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref q) = query.q {
            let q = q.trim();
            if !q.is_empty() {
                params.push(contains_pattern(q));
                let n = params.len();
                conditions.push(format!(
                    "(LOWER(title) LIKE ${n} ESCAPE '\\' OR LOWER(author) LIKE ${n} ESCAPE '\\' OR LOWER(COALESCE(isbn, '')) LIKE ${n} ESCAPE '\\' OR LOWER(barcode) LIKE ${n} ESCAPE '\\')"
                ));
            }
        }

        if query.available == Some(true) {
            conditions.push("available_copies > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM books {} ORDER BY title, id LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, Book>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let books = select_builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book; every copy starts on the shelf
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let copies = CopyCounts::new(book.total_copies)?;

        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (barcode, title, author, isbn, publisher, publication_year,
                               description, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&book.barcode)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(copies.total)
        .bind(copies.available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::unique_violation_or(e, DUPLICATE_BARCODE))
    }

    /// Update a book; `None` fields keep their current value.
    ///
    /// A new total shifts availability by the same delta under a row lock.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let copies = match book.total_copies {
            Some(total) => current.copies().resize(total)?,
            None => current.copies(),
        };

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                barcode = COALESCE($2, barcode),
                title = COALESCE($3, title),
                author = COALESCE($4, author),
                isbn = COALESCE($5, isbn),
                publisher = COALESCE($6, publisher),
                publication_year = COALESCE($7, publication_year),
                description = COALESCE($8, description),
                total_copies = $9,
                available_copies = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.barcode)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(copies.total)
        .bind(copies.available)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_violation_or(e, DUPLICATE_BARCODE))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book. Refused while copies are out on loan.
    ///
    /// Ledger rows keep their history with `book_id` set to NULL.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE book_id = $1 AND transaction_type = 'ISSUE' AND status = 'ACTIVE'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::BusinessRule(format!(
                "Book has {} active loan(s); it cannot be deleted",
                active
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
