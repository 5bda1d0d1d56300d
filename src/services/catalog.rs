//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn get_book_by_barcode(&self, barcode: &str) -> AppResult<Book> {
        self.repository.books.get_by_barcode(barcode).await
    }

    /// Create a new book; barcodes are unique
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.barcode_exists(&book.barcode, None).await? {
            return Err(AppError::Validation(format!(
                "A book with barcode {} already exists",
                book.barcode
            )));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, barcode = %created.barcode, "Book added to catalog");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        if let Some(ref barcode) = book.barcode {
            if self.repository.books.barcode_exists(barcode, Some(id)).await? {
                return Err(AppError::Validation(format!(
                    "A book with barcode {} already exists",
                    barcode
                )));
            }
        }

        self.repository.books.update(id, &book).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book removed from catalog");
        Ok(())
    }

    /// Fill an empty catalog with a few sample books. Returns how many were added.
    pub async fn seed_sample_books(&self) -> AppResult<usize> {
        if self.repository.books.count().await? > 0 {
            return Ok(0);
        }

        let samples = sample_books();
        let added = samples.len();
        for book in samples {
            self.repository.books.create(&book).await?;
        }

        tracing::info!(added, "Sample catalog seeded");
        Ok(added)
    }
}

fn sample_books() -> Vec<CreateBook> {
    let book = |barcode: &str,
                title: &str,
                author: &str,
                isbn: &str,
                publisher: &str,
                year: i32,
                description: &str,
                copies: i32| CreateBook {
        barcode: barcode.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        isbn: Some(isbn.to_string()),
        publisher: Some(publisher.to_string()),
        publication_year: Some(year),
        description: Some(description.to_string()),
        total_copies: copies,
    };

    vec![
        book(
            "LIB-0001",
            "The Rust Programming Language",
            "Steve Klabnik, Carol Nichols",
            "9781718503106",
            "No Starch Press",
            2023,
            "The official book on the Rust programming language",
            4,
        ),
        book(
            "LIB-0002",
            "Designing Data-Intensive Applications",
            "Martin Kleppmann",
            "9781449373320",
            "O'Reilly Media",
            2017,
            "The big ideas behind reliable, scalable and maintainable systems",
            3,
        ),
        book(
            "LIB-0003",
            "Structure and Interpretation of Computer Programs",
            "Harold Abelson, Gerald Jay Sussman",
            "9780262510875",
            "MIT Press",
            1996,
            "Classic introduction to computation and abstraction",
            2,
        ),
        book(
            "LIB-0004",
            "The Pragmatic Programmer",
            "David Thomas, Andrew Hunt",
            "9780135957059",
            "Addison-Wesley",
            2019,
            "Your journey to mastery, 20th anniversary edition",
            3,
        ),
        book(
            "LIB-0005",
            "Operating Systems: Three Easy Pieces",
            "Remzi H. Arpaci-Dusseau, Andrea C. Arpaci-Dusseau",
            "9781985086593",
            "Arpaci-Dusseau Books",
            2018,
            "Virtualization, concurrency and persistence",
            2,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_sample_books_are_valid_and_unique() {
        let books = sample_books();
        assert_eq!(books.len(), 5);
        for book in &books {
            assert!(book.validate().is_ok(), "invalid sample {}", book.barcode);
        }

        let mut barcodes: Vec<_> = books.iter().map(|b| b.barcode.as_str()).collect();
        barcodes.sort_unstable();
        barcodes.dedup();
        assert_eq!(barcodes.len(), books.len());
    }
}
