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

//! Domain rules that every book must satisfy regardless of what else is stored.

use crate::model::NewBook;

/// Earliest year in which a book can have been published.
const MIN_PUBLICATION_YEAR: i32 = 1450;

/// Year from which books must carry an ISBN.
const ISBN_REQUIRED_SINCE: i32 = 1970;

/// Number of digits in a valid ISBN.
const ISBN_LENGTH: usize = 13;

/// Checks if `isbn` looks like an ISBN-13.  The checksum is not verified.
fn is_valid_isbn(isbn: Option<&str>) -> bool {
    match isbn {
        Some(isbn) => isbn.len() == ISBN_LENGTH && isbn.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Validates `book` against the domain rules given the `current_year`.
///
/// Returns the list of all broken rules, or an empty list if the book is valid.
pub(super) fn validate_book(book: &NewBook, current_year: i32) -> Vec<String> {
    let mut violations = vec![];

    let year = *book.publication_year();
    if year > current_year {
        violations.push("Publication year cannot be in the future.".to_owned());
    }
    if year < MIN_PUBLICATION_YEAR {
        violations.push(format!("Books cannot be written before {}.", MIN_PUBLICATION_YEAR));
    }

    if book.title().trim().is_empty() {
        violations.push("Title is mandatory.".to_owned());
    }

    if book.illustrator_id().as_i32() <= 0 {
        violations.push("Illustrator is mandatory.".to_owned());
    }

    if year >= ISBN_REQUIRED_SINCE && !is_valid_isbn(book.isbn().as_deref()) {
        violations.push(format!(
            "For books published after {}, ISBN must be exactly {} digits.",
            ISBN_REQUIRED_SINCE, ISBN_LENGTH
        ));
    }

    violations
}
