use axum::{debug_handler, response::Html};

use crate::include_res;

#[debug_handler]
pub async fn index() -> Html<&'static str> {
    Html(include_res!(str, "/pages/index.html"))
}
