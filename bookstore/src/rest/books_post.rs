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

//! API to create a new book.

use crate::driver::{CreateBookError, Driver};
use crate::model::{AuthorId, BookId, Genre, IllustratorId, NewBook};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, http};
use bookstore_core::rest::RestError;
use log::debug;
use serde::{Deserialize, Serialize};

/// Message sent by the client to create a book.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBookRequest {
    /// Title of the book.
    title: String,

    /// Year in which the book was published.
    publication_year: i32,

    /// ISBN-13 of the book, if any.
    #[serde(default)]
    isbn: Option<String>,

    /// Illustrator that owns the book.  Zero if missing, which never matches an illustrator.
    #[serde(default)]
    illustrator_id: IllustratorId,

    /// Authors credited for the book.
    #[serde(default)]
    author_ids: Vec<AuthorId>,

    /// Genres the book belongs to.
    #[serde(default)]
    genres: Vec<Genre>,
}

impl From<CreateBookRequest> for NewBook {
    fn from(request: CreateBookRequest) -> Self {
        NewBook::new(
            request.title,
            request.publication_year,
            request.isbn,
            request.illustrator_id,
            request.author_ids,
            request.genres,
        )
    }
}

/// Message returned by the server after creating a book.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct CreateBookResponse {
    /// Identity assigned to the new book.
    id: BookId,
}

impl From<CreateBookError> for RestError {
    fn from(e: CreateBookError) -> Self {
        match e {
            CreateBookError::Driver(e) => RestError::InternalError(e.to_string()),
            e => {
                debug!("Rejected book creation: {}", e);
                RestError::InvalidRequest(e.messages())
            }
        }
    }
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, RestError> {
    let id = driver.create_book(request.into()).await?;
    Ok((http::StatusCode::CREATED, Json(CreateBookResponse { id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::rest::testutils::*;
    use bookstore_core::rest::testutils::*;
    use bookstore_core::test_payload_must_be_json;
    use serde_json::json;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/api/books".to_owned())
    }

    #[tokio::test]
    async fn test_create_ok() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Pixel", "Artist").await;
        let author = context.create_author("Integration", "Tester").await;

        let request = CreateBookRequest {
            title: "Integration Test Book".to_owned(),
            publication_year: 2024,
            isbn: Some("9780132350884".to_owned()),
            illustrator_id: illustrator,
            author_ids: vec![author],
            genres: vec![Genre::ScienceFiction],
        };
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<CreateBookResponse>()
            .await;

        assert_eq!(
            vec![BookSummary::new(
                response.id,
                "Integration Test Book".to_owned(),
                2024,
                Some("9780132350884".to_owned()),
                "Pixel Artist".to_owned(),
                vec!["Integration Tester".to_owned()],
                vec![Genre::ScienceFiction],
            )],
            context.list_books().await
        );
    }

    #[tokio::test]
    async fn test_create_wire_format() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Pixel", "Artist").await;

        let body = OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Old book",
                "publicationYear": 1900,
                "illustratorId": illustrator.as_i32(),
            }))
            .await
            .expect_status(http::StatusCode::CREATED)
            .take_body_as_text()
            .await;
        let id = context.list_books().await[0].id().as_i32();
        assert_eq!(format!("{{\"id\":{}}}", id), body);
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Pixel", "Artist").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": " ",
                "publicationYear": 1400,
                "isbn": null,
                "illustratorId": illustrator.as_i32(),
                "authorIds": [],
                "genres": ["Drama"],
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_errors(&["Books cannot be written before 1450.", "Title is mandatory."])
            .await;

        assert!(context.list_books().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_short_isbn() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Pixel", "Artist").await;
        let author = context.create_author("John", "Doe").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Short",
                "publicationYear": 1980,
                "isbn": "123",
                "illustratorId": illustrator.as_i32(),
                "authorIds": [author.as_i32()],
                "genres": [],
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("^For books published after 1970, ISBN must be exactly 13 digits\\.$")
            .await;
    }

    #[tokio::test]
    async fn test_create_unknown_author() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Pixel", "Artist").await;
        let author = context.create_author("John", "Doe").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Lost",
                "publicationYear": 1900,
                "illustratorId": illustrator.as_i32(),
                "authorIds": [author.as_i32(), author.as_i32() + 1],
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_errors(&["One or more authors not found."])
            .await;
    }

    #[tokio::test]
    async fn test_create_unknown_illustrator() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Lost",
                "publicationYear": 1900,
                "illustratorId": 10,
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_errors(&["Illustrator not found."])
            .await;
    }

    #[tokio::test]
    async fn test_create_missing_illustrator() {
        let context = TestContext::setup().await;
        context.create_illustrator("Jane", "Art").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Orphan",
                "publicationYear": 1900,
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_errors(&["Illustrator not found."])
            .await;
        assert!(context.list_books().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Jane", "Art").await;
        let author = context.create_author("John", "Doe").await;

        let request = json!({
            "title": "My Book",
            "publicationYear": 2020,
            "isbn": "9780000000001",
            "illustratorId": illustrator.as_i32(),
            "authorIds": [author.as_i32()],
        });
        OneShotBuilder::new(context.app(), route())
            .send_json(&request)
            .await
            .expect_status(http::StatusCode::CREATED)
            .take_body_as_text()
            .await;

        let mut request = request;
        request["isbn"] = json!("9781234567890");
        OneShotBuilder::new(context.app(), route())
            .send_json(&request)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_errors(&["This book already exists."])
            .await;
    }

    #[tokio::test]
    async fn test_create_duplicate_isbn() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Jane", "Art").await;

        for (title, exp_status) in
            [("First", http::StatusCode::CREATED), ("Second", http::StatusCode::BAD_REQUEST)]
        {
            let checker = OneShotBuilder::new(context.app(), route())
                .send_json(json!({
                    "title": title,
                    "publicationYear": 2001,
                    "isbn": "9781234567890",
                    "illustratorId": illustrator.as_i32(),
                }))
                .await
                .expect_status(exp_status);
            if exp_status == http::StatusCode::CREATED {
                checker.take_body_as_text().await;
            } else {
                checker.expect_errors(&["Database error (possible duplicate ISBN)."]).await;
            }
        }
    }

    #[tokio::test]
    async fn test_create_internal_error() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Jane", "Art").await;
        context.break_db("DROP TABLE book_authors").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Doomed",
                "publicationYear": 1900,
                "illustratorId": illustrator.as_i32(),
            }))
            .await
            .expect_status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .expect_errors(&["Internal server error"])
            .await;
    }

    #[tokio::test]
    async fn test_create_unknown_genre() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Jane", "Art").await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({
                "title": "Cookbook",
                "publicationYear": 1900,
                "illustratorId": illustrator.as_i32(),
                "genres": ["Cooking"],
            }))
            .await
            .expect_status(http::StatusCode::UNPROCESSABLE_ENTITY)
            .expect_text("unknown variant `Cooking`")
            .await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
