// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Operations on the catalog of books.

use crate::db;
use crate::driver::validator::validate_book;
use crate::driver::{AUTHORS_NOT_FOUND, CreateBookError, Driver, ILLUSTRATOR_NOT_FOUND};
use crate::model::*;
use bookstore_core::db::DbError;
use bookstore_core::driver::DriverResult;
use log::warn;

impl Driver {
    /// Creates a new `book` after checking that it references existing entities, that it is valid
    /// and that it is not a duplicate of an existing book.  Returns the identity of the new book.
    ///
    /// All checks and the final insertion happen within a single transaction, and the checks run
    /// in a fixed order: the first one to fail determines the returned error.
    pub(crate) async fn create_book(self, book: NewBook) -> Result<BookId, CreateBookError> {
        let current_year = self.clock.now_utc().year();

        let mut tx = self.db.begin().await?;

        let authors = db::get_authors(tx.ex(), book.author_ids()).await?;
        if authors.len() != book.author_ids().len() {
            return Err(CreateBookError::ReferenceNotFound(AUTHORS_NOT_FOUND));
        }

        if !db::illustrator_exists(tx.ex(), *book.illustrator_id()).await? {
            return Err(CreateBookError::ReferenceNotFound(ILLUSTRATOR_NOT_FOUND));
        }

        let violations = validate_book(&book, current_year);
        if !violations.is_empty() {
            return Err(CreateBookError::ValidationFailed(violations));
        }

        let mut author_ids = book.author_ids().clone();
        author_ids.sort();
        let candidates =
            db::get_books_by_title_year(tx.ex(), book.title(), *book.publication_year()).await?;
        for (_, mut candidate_author_ids) in candidates {
            candidate_author_ids.sort();
            if candidate_author_ids == author_ids {
                return Err(CreateBookError::DuplicateBook);
            }
        }

        let id = match db::insert_book(tx.ex(), &book).await {
            Ok(id) => id,
            Err(DbError::AlreadyExists) => {
                warn!("Uniqueness constraint rejected book '{}'", book.title());
                return Err(CreateBookError::StorageConflict);
            }
            Err(e) => return Err(e.into()),
        };
        match tx.commit().await {
            Ok(()) => Ok(id),
            Err(DbError::AlreadyExists) => {
                warn!("Uniqueness constraint rejected book '{}' at commit time", book.title());
                Err(CreateBookError::StorageConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists all books whose authors match the optional `filter`, sorted by `sort`.
    pub(crate) async fn list_books(
        self,
        filter: Option<AuthorFilter>,
        sort: SortKey,
    ) -> DriverResult<Vec<BookSummary>> {
        let books = db::list_books(&mut self.db.ex().await?, filter.as_ref(), sort).await?;
        Ok(books)
    }
}
