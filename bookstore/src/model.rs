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

//! High-level data types.

use bookstore_core::model::{ModelError, ModelResult};
use derive_getters::Getters;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates a newtype for the numeric identity that the database assigns to an entity.
macro_rules! entity_id [
    ( $name:ident, $entity:literal ) => {
        #[doc = concat!("Identity of ", $entity, ".")]
        #[derive(
            Clone,
            Constructor,
            Copy,
            Debug,
            Default,
            Deserialize,
            Eq,
            Ord,
            PartialEq,
            PartialOrd,
            Serialize,
        )]
        #[serde(transparent)]
        pub(crate) struct $name(i32);

        impl $name {
            /// Returns the raw identity as stored in the database.
            pub(crate) fn as_i32(self) -> i32 {
                self.0
            }
        }
    }
];

entity_id!(AuthorId, "an author");
entity_id!(BookId, "a book");
entity_id!(IllustratorId, "an illustrator");

/// An author that can be credited for one or more books.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub(crate) struct Author {
    /// Identity of the author.
    id: AuthorId,

    /// First name of the author.
    first_name: String,

    /// Last name of the author.
    last_name: String,
}

impl Author {
    /// Returns the name of the author as displayed in book listings.
    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An illustrator that owns zero or more books.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub(crate) struct Illustrator {
    /// Identity of the illustrator.
    id: IllustratorId,

    /// First name of the illustrator.
    first_name: String,

    /// Last name of the illustrator.
    last_name: String,
}

impl Illustrator {
    /// Returns the name of the illustrator as displayed in book listings.
    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Literary genres that can be attached to a book.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) enum Genre {
    Action,
    Adventure,
    Biography,
    Comedy,
    Drama,
    Fantasy,
    History,
    Horror,
    Mystery,
    Poetry,
    Romance,
    ScienceFiction,
    Thriller,
}

impl Genre {
    /// All known genres.
    const ALL: [Genre; 13] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Biography,
        Genre::Comedy,
        Genre::Drama,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Mystery,
        Genre::Poetry,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::Thriller,
    ];

    /// Returns the textual label of the genre.
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Biography => "Biography",
            Genre::Comedy => "Comedy",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Mystery => "Mystery",
            Genre::Poetry => "Poetry",
            Genre::Romance => "Romance",
            Genre::ScienceFiction => "ScienceFiction",
            Genre::Thriller => "Thriller",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Genre::ALL
            .into_iter()
            .find(|genre| genre.as_str() == s)
            .ok_or_else(|| ModelError(format!("Unknown genre '{}'", s)))
    }
}

/// Encodes a list of genres into its persisted form: a comma-separated list of labels.
pub(crate) fn encode_genres(genres: &[Genre]) -> String {
    genres.iter().map(|genre| genre.as_str()).collect::<Vec<&str>>().join(",")
}

/// Decodes a list of genres from its persisted form, skipping empty entries.
pub(crate) fn decode_genres(raw: &str) -> ModelResult<Vec<Genre>> {
    raw.split(',').filter(|token| !token.is_empty()).map(Genre::from_str).collect()
}

/// A request to create a new book.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub(crate) struct NewBook {
    /// Title of the book.
    title: String,

    /// Year in which the book was published.
    publication_year: i32,

    /// ISBN-13 of the book, if any.
    isbn: Option<String>,

    /// Illustrator that owns the book.
    illustrator_id: IllustratorId,

    /// Authors credited for the book.
    author_ids: Vec<AuthorId>,

    /// Genres the book belongs to.
    genres: Vec<Genre>,
}

/// Denormalized view of a book as returned by listings.
#[derive(Constructor, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookSummary {
    /// Identity of the book.
    id: BookId,

    /// Title of the book.
    title: String,

    /// Year in which the book was published.
    year: i32,

    /// ISBN-13 of the book, if any.
    isbn: Option<String>,

    /// Full name of the illustrator of the book.
    illustrator_name: String,

    /// Full names of the authors of the book, sorted by author identity.
    authors: Vec<String>,

    /// Genres the book belongs to.
    genres: Vec<Genre>,
}

/// Criteria to sort book listings by.  Ties are always broken by the book identity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) enum SortKey {
    /// Sort by book identity, which matches creation order.
    #[default]
    Id,

    /// Sort by title.
    Title,

    /// Sort by publication year.
    Year,
}

impl SortKey {
    /// Interprets a user-supplied sort key.  Unknown or missing keys sort by identity.
    pub(crate) fn parse(raw: Option<&str>) -> SortKey {
        match raw.map(str::to_lowercase).as_deref() {
            Some("title") => SortKey::Title,
            Some("year") => SortKey::Year,
            _ => SortKey::Id,
        }
    }
}

/// Substring to match against the first or last names of the authors of a book.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AuthorFilter(String);

impl AuthorFilter {
    /// Creates a filter from a user-supplied value.  Blank values mean "no filter".
    pub(crate) fn new(raw: Option<String>) -> Option<Self> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Some(AuthorFilter(raw)),
            _ => None,
        }
    }

    /// Returns the substring to look for.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}
