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

//! API to list books.

use crate::driver::Driver;
use crate::model::{AuthorFilter, BookSummary, SortKey};
use axum::Json;
use axum::extract::{Query, State};
use bookstore_core::rest::{EmptyBody, RestError};
use serde::Deserialize;

/// Query parameters accepted by this API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListBooksQuery {
    /// Substring to look for in the first or last names of the authors of each book.
    author: Option<String>,

    /// Property to sort books by: `title` or `year`.  Anything else sorts by identity.
    sort_by: Option<String>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Query(query): Query<ListBooksQuery>,
    _: EmptyBody,
) -> Result<Json<Vec<BookSummary>>, RestError> {
    let filter = AuthorFilter::new(query.author);
    let sort = SortKey::parse(query.sort_by.as_deref());
    let books = driver.list_books(filter, sort).await?;
    Ok(Json(books))
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use bookstore_core::rest::testutils::*;
    use bookstore_core::test_payload_must_be_empty;
    use serde_json::json;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/books".to_owned())
    }

    /// Creates a book through the API.
    async fn create_book(
        context: &TestContext,
        title: &str,
        year: i32,
        illustrator: IllustratorId,
        authors: &[AuthorId],
    ) {
        OneShotBuilder::new(context.app(), (http::Method::POST, "/api/books"))
            .send_json(json!({
                "title": title,
                "publicationYear": year,
                "isbn": format!("978{:010}", year),
                "illustratorId": illustrator,
                "authorIds": authors,
                "genres": ["Drama"],
            }))
            .await
            .expect_status(http::StatusCode::CREATED)
            .take_body_as_text()
            .await;
    }

    /// Sends a listing request with the given `query` and returns the titles of the books.
    async fn list_titles(context: &TestContext, query: &[(&str, &str)]) -> Vec<String> {
        OneShotBuilder::new(context.app(), route())
            .with_query(query)
            .send_empty()
            .await
            .expect_json::<Vec<BookSummary>>()
            .await
            .into_iter()
            .map(|b| b.title().clone())
            .collect()
    }

    /// Populates the catalog with a few books by different authors.
    async fn setup_catalog() -> TestContext {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Norman", "Rockwell").await;
        let king = context.create_author("Stephen", "King").await;
        let asimov = context.create_author("Isaac", "Asimov").await;
        let duras = context.create_author("Marguerite", "Duras").await;

        create_book(&context, "The Stand", 1978, illustrator, &[king]).await;
        create_book(&context, "Foundation", 1951, illustrator, &[asimov]).await;
        create_book(&context, "Carrie", 1974, illustrator, &[king]).await;
        create_book(&context, "L'Amant", 1984, illustrator, &[duras, asimov]).await;
        context
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_json::<Vec<BookSummary>>()
            .await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_wire_format() {
        let context = TestContext::setup().await;
        let illustrator = context.create_illustrator("Beya", "Rebaï").await;
        let asimov = context.create_author("Isaac", "Asimov").await;
        let king = context.create_author("Stephen", "King").await;
        create_book(&context, "Together", 1999, illustrator, &[king, asimov]).await;

        let body = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .take_body_as_text()
            .await;
        let response: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json!([{
                "id": context.list_books().await[0].id(),
                "title": "Together",
                "year": 1999,
                "isbn": "9780000001999",
                "illustratorName": "Beya Rebaï",
                "authors": ["Isaac Asimov", "Stephen King"],
                "genres": ["Drama"],
            }]),
            response
        );
    }

    #[tokio::test]
    async fn test_sort() {
        let context = setup_catalog().await;

        let by_id = vec!["The Stand", "Foundation", "Carrie", "L'Amant"];
        let by_title = vec!["Carrie", "Foundation", "L'Amant", "The Stand"];
        let by_year = vec!["Foundation", "Carrie", "The Stand", "L'Amant"];

        assert_eq!(by_id, list_titles(&context, &[]).await);
        assert_eq!(by_id, list_titles(&context, &[("sortBy", "id")]).await);
        assert_eq!(by_id, list_titles(&context, &[("sortBy", "unknown")]).await);
        assert_eq!(by_title, list_titles(&context, &[("sortBy", "title")]).await);
        assert_eq!(by_title, list_titles(&context, &[("sortBy", "TITLE")]).await);
        assert_eq!(by_year, list_titles(&context, &[("sortBy", "year")]).await);
        assert_eq!(by_year, list_titles(&context, &[("sortBy", "Year")]).await);
    }

    #[tokio::test]
    async fn test_filter_by_author() {
        let context = setup_catalog().await;

        assert_eq!(
            vec!["The Stand", "Carrie"],
            list_titles(&context, &[("author", "King")]).await
        );
        assert_eq!(
            vec!["Carrie", "The Stand"],
            list_titles(&context, &[("author", "Stephen"), ("sortBy", "title")]).await
        );
        assert_eq!(
            vec!["Foundation", "L'Amant"],
            list_titles(&context, &[("author", "Asim")]).await
        );
        assert_eq!(vec!["L'Amant"], list_titles(&context, &[("author", "Marguerite")]).await);
        assert!(list_titles(&context, &[("author", "asimov")]).await.is_empty());
        assert!(list_titles(&context, &[("author", "Tolkien")]).await.is_empty());
        assert_eq!(4, list_titles(&context, &[("author", "")]).await.len());
        assert_eq!(4, list_titles(&context, &[("author", "  ")]).await.len());
    }

    #[tokio::test]
    async fn test_internal_error() {
        let context = setup_catalog().await;
        context.break_db("UPDATE books SET genres = 'Drama,Bogus' WHERE title = 'Carrie'").await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .expect_errors(&["Internal server error"])
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
