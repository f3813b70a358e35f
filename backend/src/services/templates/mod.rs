//! # Template Service Module
//!
//! Catalog of report templates. Templates are authored by admin tooling;
//! the engine only reads them.
//!
//! ## Registered Routes (under `/api/templates`):
//!
//! *   **`POST /save`**: creates or replaces a `ReportTemplate`.
//! *   **`GET /{template_id}`**: returns one template, or 404.

pub mod get;
pub mod save;

use crate::db::SqliteDb;
use crate::error::ReportError;
use actix_web::web::{get, post, scope};
use actix_web::Scope;
use common::model::template::ReportTemplate;

const API_PATH: &str = "/api/templates";

/// Read access to templates for the engine.
pub trait TemplateStore: Send + Sync {
    fn template(&self, id: &str) -> Result<Option<ReportTemplate>, ReportError>;
}

impl TemplateStore for SqliteDb {
    fn template(&self, id: &str) -> Result<Option<ReportTemplate>, ReportError> {
        get::get_template(self, id)
    }
}

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/save", post().to(save::process))
        .route("/{template_id}", get().to(get::process))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::templates::save::save_template;
    use crate::test_support::{custom_template, Fixture};
    use common::model::template::{LayoutBand, Orientation, PageSize};

    #[test]
    fn templates_round_trip_through_the_catalog() {
        let fx = Fixture::new();
        let mut template = custom_template("t1", "employees", "SELECT 1;");
        template.layout.bands.push(LayoutBand {
            name: "detail".to_string(),
            kind: Some("detail".to_string()),
            fields: vec!["employee_id".to_string()],
        });
        template.page_settings.size = PageSize::Letter;
        template.page_settings.orientation = Orientation::Landscape;
        save_template(&fx.db, &template).unwrap();

        assert_eq!(fx.db.template("t1").unwrap(), Some(template));
        assert_eq!(fx.db.template("missing").unwrap(), None);
    }

    #[test]
    fn empty_ids_are_rejected() {
        let fx = Fixture::new();
        let template = custom_template(" ", "employees", "SELECT 1");
        assert!(matches!(
            save_template(&fx.db, &template),
            Err(ReportError::BadRequest(_))
        ));
    }

    #[actix_web::test]
    async fn templates_are_served_over_http() {
        use crate::services::json_config;
        use actix_web::http::StatusCode;
        use actix_web::{test as actix_test, web, App};

        let fx = Fixture::new();
        let app = actix_test::init_service(
            App::new()
                .app_data(json_config())
                .app_data(web::Data::new(fx.db.clone()))
                .service(configure_routes()),
        )
        .await;

        let template = custom_template("t9", "employees", "SELECT 1");
        let req = actix_test::TestRequest::post()
            .uri("/api/templates/save")
            .set_json(&template)
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = actix_test::TestRequest::get().uri("/api/templates/t9").to_request();
        let fetched: ReportTemplate = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, template);

        let req = actix_test::TestRequest::get().uri("/api/templates/nope").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
