//! API integration tests, driving the router over an in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use bookkeep_server::{
    api,
    config::AppConfig,
    repository::MemoryStore,
    services::FixedClock,
    AppState,
};

fn app() -> Router {
    let today = NaiveDate::from_ymd_opt(2016, 3, 15).unwrap();
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(FixedClock(today)),
    );
    api::create_router(state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post(app: &Router, uri: &str, form: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, location, body)
}

async fn seed(app: &Router) {
    for (title, author) in [
        ("The Hobbit", "J.R.R. Tolkien"),
        ("Emma", "Jane Austen"),
        ("Dune", "Frank Herbert"),
    ] {
        let form = format!(
            "title={}&author={}&genre=Fiction&first_published=",
            title.replace(' ', "+"),
            author.replace(' ', "+")
        );
        let (status, _, _) = post(app, "/books/add", &form).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
    }

    let (status, _, _) = post(
        app,
        "/patrons/add",
        "first_name=Ada&last_name=Lovelace&address=1+Main+St&email=ada%40example.com&library_id=MCL1&zip_code=10001",
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    // Hobbit overdue, Emma out but due later, Dune returned
    for form in [
        "book_id=1&patron_id=1&loaned_on=2016-03-01&return_by=2016-03-08",
        "book_id=2&patron_id=1&loaned_on=2016-03-14&return_by=2016-03-21",
        "book_id=3&patron_id=1&loaned_on=2016-03-01&return_by=2016-03-08&returned_on=2016-03-05",
    ] {
        let (status, _, _) = post(app, "/loans/add", form).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_book_redirects_to_listing() {
    let app = app();
    let (status, location, _) = post(
        &app,
        "/books/add",
        "title=Emma&author=Jane+Austen&genre=Novel&first_published=1815",
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/books"));

    let (status, body) = get(&app, "/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Books");
    assert_eq!(body["books"][0]["title"], "Emma");
    assert_eq!(body["books"][0]["first_published"], 1815);
}

#[tokio::test]
async fn test_invalid_book_rerenders_form() {
    let app = app();
    let (status, location, body) = post(
        &app,
        "/books/add",
        "title=&author=Jane+Austen&genre=Novel&first_published=eighteen",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(location.is_none());
    assert_eq!(body["title"], "New Book");
    assert_eq!(body["errors"]["title"], "Title is required");
    assert!(body["errors"]["first_published"].is_string());
    // Submitted values are echoed back
    assert_eq!(body["book"]["author"], "Jane Austen");

    let (_, body) = get(&app, "/books").await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["links"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_book_ids_at_the_edges() {
    let app = app();

    for bad in ["0", "-5"] {
        let form = format!("id={}&title=A&author=B&genre=C", bad);
        let (status, location, body) = post(&app, "/books/add", &form).await;
        assert_eq!(status, StatusCode::OK);
        assert!(location.is_none());
        assert_eq!(body["errors"]["id"], "Id must be 1 or greater");
    }

    let (status, _, _) = post(&app, "/books/add", "id=2147483647&title=A&author=B&genre=C").await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    // No id above the maximum is left to hand out
    let (status, _, _) = post(&app, "/books/add", "title=D&author=E&genre=F").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = get(&app, "/books").await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_book_listing_pages_and_links() {
    let app = app();
    for n in 1..=7 {
        let form = format!("title=Book+{}&author=Author&genre=Fiction", n);
        post(&app, "/books/add", &form).await;
    }

    let (_, body) = get(&app, "/books?page=2").await;
    assert_eq!(body["total"], 7);
    assert_eq!(body["page"], 2);
    assert_eq!(body["books"].as_array().unwrap().len(), 2);
    assert_eq!(body["books"][0]["title"], "Book 6");
    assert_eq!(body["links"][0]["href"], "?page=1");
    assert_eq!(body["links"][1]["href"], "?page=2");

    // Unparsable page numbers fall back to the first page
    let (_, body) = get(&app, "/books?page=abc").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["books"][0]["title"], "Book 1");
}

#[tokio::test]
async fn test_book_search_and_filters() {
    let app = app();
    seed(&app).await;

    let (_, body) = get(&app, "/books?search=tolkien").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["title"], "The Hobbit");
    assert_eq!(body["links"][0]["href"], "?search=tolkien&page=1");

    let (_, body) = get(&app, "/books?filter=overdue").await;
    assert_eq!(body["title"], "Overdue Books");
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["title"], "The Hobbit");
    assert_eq!(body["links"][0]["href"], "?filter=overdue&page=1");

    let (_, body) = get(&app, "/books?filter=checked").await;
    assert_eq!(body["title"], "Checked Out Books");
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_book_details_and_update() {
    let app = app();
    seed(&app).await;

    let (status, body) = get(&app, "/books/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "The Hobbit");
    assert_eq!(body["loans"].as_array().unwrap().len(), 1);

    let (status, location, _) = post(
        &app,
        "/books/1",
        "title=The+Hobbit&author=J.R.R.+Tolkien&genre=Fantasy&first_published=1937",
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/books"));

    let (_, body) = get(&app, "/books/1").await;
    assert_eq!(body["book"]["genre"], "Fantasy");
    assert_eq!(body["book"]["first_published"], "1937");

    // Rejected update keeps the stored title in the page heading
    let (status, _, body) = post(&app, "/books/1", "title=&author=Tolkien&genre=Fantasy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "The Hobbit");
    assert_eq!(body["errors"]["title"], "Title is required");
}

#[tokio::test]
async fn test_unknown_records_are_not_found() {
    let app = app();

    let (status, _) = get(&app, "/books/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = post(&app, "/books/42", "title=X&author=Y&genre=Z").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/patrons/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/loans/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patron_pages() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/patrons/add",
        "first_name=Ada&last_name=Lovelace&address=1+Main+St&email=ada%40example.com&library_id=MCL1&zip_code=ten",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "New Patron");
    assert_eq!(body["errors"]["zip_code"], "Zip code must be a whole number");

    seed(&app).await;

    let (_, body) = get(&app, "/patrons?search=love").await;
    assert_eq!(body["title"], "Patrons");
    assert_eq!(body["total"], 1);

    let (status, body) = get(&app, "/patrons/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Ada Lovelace");
    assert_eq!(body["loans"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_new_loan_form_is_prefilled() {
    let app = app();
    seed(&app).await;

    let (status, body) = get(&app, "/loans/add").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "New Loan");
    assert_eq!(body["loan"]["loaned_on"], "2016-03-15");
    assert_eq!(body["loan"]["return_by"], "2016-03-22");
    assert_eq!(body["books"].as_array().unwrap().len(), 3);
    assert_eq!(body["patrons"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_loan_listing_filters() {
    let app = app();
    seed(&app).await;

    let (_, body) = get(&app, "/loans").await;
    assert_eq!(body["title"], "Loans");
    assert_eq!(body["total"], 3);

    let (_, body) = get(&app, "/loans?filter=overdue").await;
    assert_eq!(body["title"], "Overdue Loans");
    assert_eq!(body["total"], 1);
    assert_eq!(body["loans"][0]["book"]["title"], "The Hobbit");

    let (_, body) = get(&app, "/loans?filter=checked").await;
    assert_eq!(body["title"], "Checked Out Loans");
    assert_eq!(body["total"], 2);

    let (_, body) = get(&app, "/loans?search=lovelace").await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_invalid_loan_rerenders_form_with_choices() {
    let app = app();
    seed(&app).await;

    let (status, _, body) = post(
        &app,
        "/loans/add",
        "book_id=1&patron_id=1&loaned_on=15/03/2016&return_by=2016-03-22",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["errors"]["loaned_on"],
        "Loaned On date invalid format. Accepted format: YYYY-MM-DD (e.g., 2016-03-15)"
    );
    assert_eq!(body["books"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_return_book() {
    let app = app();
    seed(&app).await;

    let (status, body) = get(&app, "/loans/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Patron: Return Book");
    assert_eq!(body["form"]["returned_on"], "2016-03-15");
    assert_eq!(body["loan"]["book"]["title"], "The Hobbit");

    let (status, _, body) = post(&app, "/loans/1", "returned_on=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["errors"]["returned_on"].is_string());

    let (status, location, _) = post(&app, "/loans/1", "returned_on=2016-03-15").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/loans"));

    let (_, body) = get(&app, "/loans?filter=overdue").await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["title"], "Overdue Loans");
}
