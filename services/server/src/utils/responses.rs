use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data
    }))
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "success": true,
        "data": data
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    #[actix_web::test]
    async fn test_success_envelope() {
        let response = created(json!({ "id": 3 }));
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 3);
        assert!(value.get("error").is_none());
    }
}
