//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        Content, ObjectBuilder, Ref, RefOr, Schema, SchemaType,
    },
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, transactions, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "1.0.0",
        description = "Library management REST API: catalog, users and the loan ledger"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::init_default_user,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::get_book_by_barcode,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_book_transactions,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::get_user_transactions,
        users::get_user_loans,
        // Transactions
        transactions::issue_book,
        transactions::return_book,
        transactions::list_overdue,
        transactions::list_transactions,
        transactions::get_transaction,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MeResponse,
            // Pages
            crate::api::response::BookPage,
            crate::api::response::UserPage,
            crate::api::response::TransactionPage,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::enums::Role,
            // Transactions
            crate::models::transaction::Transaction,
            crate::models::transaction::TransactionDetails,
            crate::models::transaction::IssueBook,
            crate::models::enums::TransactionType,
            crate::models::enums::TransactionStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon, &EnvelopeAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "users", description = "User management"),
        (name = "transactions", description = "Issue, return and loan history")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Wraps every documented response in the `{ success, message, data }`
/// envelope. Error responses without a body get the `ErrorResponse` schema.
struct EnvelopeAddon;

impl Modify for EnvelopeAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        for path_item in openapi.paths.paths.values_mut() {
            for operation in path_item.operations.values_mut() {
                for (status, response) in operation.responses.responses.iter_mut() {
                    let RefOr::T(response) = response else {
                        continue;
                    };

                    if !response.content.is_empty() {
                        for content in response.content.values_mut() {
                            content.schema = envelope(Some(content.schema.clone()));
                        }
                        continue;
                    }

                    let schema = if status.starts_with('2') {
                        envelope(None)
                    } else {
                        Ref::from_schema_name("ErrorResponse").into()
                    };
                    response
                        .content
                        .insert("application/json".to_string(), Content::new(schema));
                }
            }
        }
    }
}

fn envelope(data: Option<RefOr<Schema>>) -> RefOr<Schema> {
    let mut envelope = ObjectBuilder::new()
        .property("success", ObjectBuilder::new().schema_type(SchemaType::Boolean))
        .required("success")
        .property("message", ObjectBuilder::new().schema_type(SchemaType::String))
        .required("message");

    if let Some(data) = data {
        envelope = envelope.property("data", data);
    }

    envelope.into()
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
