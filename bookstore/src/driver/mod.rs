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

//! Business logic for the service.

use bookstore_core::clocks::Clock;
use bookstore_core::db::{Db, DbError};
use bookstore_core::driver::DriverError;
use std::sync::Arc;

mod books;
#[cfg(test)]
mod testutils;
mod validator;

/// Message returned when some of the authors of a new book do not exist.
const AUTHORS_NOT_FOUND: &str = "One or more authors not found.";

/// Message returned when the illustrator of a new book does not exist.
const ILLUSTRATOR_NOT_FOUND: &str = "Illustrator not found.";

/// Errors that can happen while creating a new book.
///
/// All variants except `Driver` describe problems with the request and carry messages that are
/// suitable for the user.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum CreateBookError {
    /// A referenced author or illustrator does not exist.
    #[error("{0}")]
    ReferenceNotFound(&'static str),

    /// The book breaks one or more domain rules.
    #[error("{}", .0.join(" "))]
    ValidationFailed(Vec<String>),

    /// A book with the same title, publication year and authors already exists.
    #[error("This book already exists.")]
    DuplicateBook,

    /// The database rejected the book due to a uniqueness constraint.
    #[error("Database error (possible duplicate ISBN).")]
    StorageConflict,

    /// Unexpected failure while talking to the database.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl CreateBookError {
    /// Returns the list of messages that describe this error to the user.
    pub(crate) fn messages(&self) -> Vec<String> {
        match self {
            CreateBookError::ValidationFailed(violations) => violations.clone(),
            e => vec![e.to_string()],
        }
    }
}

impl From<DbError> for CreateBookError {
    fn from(e: DbError) -> Self {
        CreateBookError::Driver(e.into())
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used to determine the current year when validating books.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub(crate) fn new(db: Arc<dyn Db + Send + Sync>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { db, clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_book_error_messages() {
        assert_eq!(
            vec!["One or more authors not found.".to_owned()],
            CreateBookError::ReferenceNotFound(AUTHORS_NOT_FOUND).messages()
        );
        assert_eq!(
            vec!["Illustrator not found.".to_owned()],
            CreateBookError::ReferenceNotFound(ILLUSTRATOR_NOT_FOUND).messages()
        );
        assert_eq!(
            vec!["First.".to_owned(), "Second.".to_owned()],
            CreateBookError::ValidationFailed(vec!["First.".to_owned(), "Second.".to_owned()])
                .messages()
        );
        assert_eq!(
            vec!["This book already exists.".to_owned()],
            CreateBookError::DuplicateBook.messages()
        );
        assert_eq!(
            vec!["Database error (possible duplicate ISBN).".to_owned()],
            CreateBookError::StorageConflict.messages()
        );
    }

    #[test]
    fn test_create_book_error_from_db_error() {
        assert_eq!(
            CreateBookError::Driver(DriverError::BackendError("Unavailable".to_owned())),
            DbError::Unavailable.into()
        );
    }
}
