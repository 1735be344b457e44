//! Library book management.
//!
//! Books are keyed by book id and carry a shelf quantity plus a count of
//! copies on loan. Borrowing at quantity zero fails with
//! [`DomainError::OutOfStock`]; returning more copies than are on loan fails
//! with [`DomainError::ReturnExceedsLoans`] instead of silently inflating
//! stock.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CardResult, DomainError, ValidationError};
use crate::record::{require_non_empty, Record};
use crate::store::{
    open_store, EntityStore, JournalBackend, MemoryBackend, StorageBackend, StorageError,
    StoreOptions,
};

/// One library book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Book id; unique within a library.
    pub book_id: String,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Copies currently on the shelf.
    pub quantity: u32,
    /// Copies currently lent out.
    pub on_loan: u32,
}

impl Book {
    /// Creates a book with all copies on the shelf.
    #[must_use]
    pub fn new(
        book_id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            book_id: book_id.into(),
            title: title.into(),
            author: author.into(),
            quantity,
            on_loan: 0,
        }
    }
}

/// Field-level update for a [`Book`]. The book id is immutable.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New author, if changing.
    pub author: Option<String>,
    /// New shelf quantity, if changing.
    pub quantity: Option<u32>,
    /// New on-loan count, if changing.
    pub on_loan: Option<u32>,
}

impl Record for Book {
    type Patch = BookPatch;

    fn key(&self) -> &str {
        &self.book_id
    }

    fn search_text(&self) -> Vec<&str> {
        vec![&self.book_id, &self.title, &self.author]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("author", &self.author)
    }

    fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(on_loan) = patch.on_loan {
            self.on_loan = on_loan;
        }
    }
}

/// A library: one [`EntityStore`] of books plus borrow/return.
pub struct Library<B: StorageBackend<Book>> {
    books: EntityStore<Book, B>,
}

impl Library<JournalBackend<Book>> {
    /// Opens or creates a durable library at the given directory.
    ///
    /// # Errors
    /// Any storage error from opening the journal backend.
    pub fn open(dir: impl AsRef<Path>) -> CardResult<Self> {
        Ok(Self {
            books: open_store(dir.as_ref(), None, StoreOptions::default())?,
        })
    }
}

impl Library<MemoryBackend<Book>> {
    /// Creates an ephemeral in-memory library.
    ///
    /// # Errors
    /// Never fails in practice; kept fallible for uniformity with
    /// [`Library::open`].
    pub fn in_memory() -> CardResult<Self> {
        Ok(Self {
            books: EntityStore::open(MemoryBackend::new(), StoreOptions::default())?,
        })
    }
}

impl<B: StorageBackend<Book>> Library<B> {
    /// Adds a new book.
    ///
    /// # Errors
    /// - [`StorageError::DuplicateKey`] if the book id is taken
    /// - [`ValidationError`] for empty title or author
    pub fn add_book(&mut self, book: Book) -> CardResult<()> {
        self.books.add(book)
    }

    /// Looks up a book by id.
    #[must_use]
    pub fn find(&self, book_id: &str) -> Option<Book> {
        self.books.get(book_id)
    }

    /// Substring search over book id, title, and author.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Book> {
        self.books.search(query)
    }

    /// Borrows one copy, returning the remaining shelf quantity.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] for an unknown book id
    /// - [`DomainError::OutOfStock`] if no copies are on the shelf; the
    ///   record is unchanged
    /// - [`DomainError::QuantityOverflow`] if the loan counter would not fit
    pub fn borrow(&mut self, book_id: &str) -> CardResult<u32> {
        let book = self
            .books
            .get(book_id)
            .ok_or_else(|| StorageError::NotFound(book_id.to_string()))?;

        if book.quantity == 0 {
            return Err(DomainError::OutOfStock {
                key: book_id.to_string(),
            }
            .into());
        }
        let on_loan = book
            .on_loan
            .checked_add(1)
            .ok_or_else(|| DomainError::QuantityOverflow {
                key: book_id.to_string(),
            })?;

        let remaining = book.quantity - 1;
        self.books.update(
            book_id,
            BookPatch {
                quantity: Some(remaining),
                on_loan: Some(on_loan),
                ..BookPatch::default()
            },
        )?;
        Ok(remaining)
    }

    /// Returns one borrowed copy, returning the new shelf quantity.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] for an unknown book id
    /// - [`DomainError::ReturnExceedsLoans`] if no copies are on loan
    /// - [`DomainError::QuantityOverflow`] if the shelf quantity would not
    ///   fit; the record is unchanged
    pub fn return_book(&mut self, book_id: &str) -> CardResult<u32> {
        let book = self
            .books
            .get(book_id)
            .ok_or_else(|| StorageError::NotFound(book_id.to_string()))?;

        if book.on_loan == 0 {
            return Err(DomainError::ReturnExceedsLoans {
                key: book_id.to_string(),
                on_loan: 0,
            }
            .into());
        }

        let quantity = book
            .quantity
            .checked_add(1)
            .ok_or_else(|| DomainError::QuantityOverflow {
                key: book_id.to_string(),
            })?;
        self.books.update(
            book_id,
            BookPatch {
                quantity: Some(quantity),
                on_loan: Some(book.on_loan - 1),
                ..BookPatch::default()
            },
        )?;
        Ok(quantity)
    }

    /// Updates a book's details.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] if the book id is absent
    /// - [`ValidationError`] if the patched record fails validation
    pub fn update(&mut self, book_id: &str, patch: BookPatch) -> CardResult<()> {
        self.books.update(book_id, patch)
    }

    /// Removes a book.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the book id is absent.
    pub fn remove_book(&mut self, book_id: &str) -> CardResult<()> {
        self.books.remove(book_id)
    }

    /// Snapshot of all books in book-id order.
    #[must_use]
    pub fn shelf(&self) -> Vec<Book> {
        self.books.list()
    }
}
