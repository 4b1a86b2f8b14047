use actix_web::{HttpResponse, Responder, get, web};

use crate::AppState;

/// Status of every configured server, served from the snapshot cache.
/// A sweep only runs when the cached snapshot is missing or expired.
#[get("/api/electrumx")]
pub async fn status_route(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.cache.get(&state.registry).await;
    HttpResponse::Ok().json(snapshot.as_ref())
}
