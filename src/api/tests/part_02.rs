use super::*;

const DIABETES_CSV: &str = "AGE,Urea,Cr,HbA1c,Chol,TG,HDL,LDL,VLDL,BMI\n\
50,4.7,46,4.9,4.2,0.9,2.4,1.4,0.5,24\n\
55,5.3,72,8.9,5.0,2.4,0,2.6,2.0,30.8\n";

#[tokio::test]
async fn test_two_row_upload_keeps_valid_row() {
    let (status, json) = send_json(
        create_test_app(),
        multipart_upload("/v1/diabetes/predict", "panel.csv", DIABETES_CSV),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["total_rows"], 2);
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 1);

    let rows = json["results"].as_array().expect("test");
    assert_eq!(rows[0]["row"], 1);
    assert_eq!(rows[0]["Diagnosis_Result"], "Non-diabetic");
    assert_eq!(rows[1]["row"], 2);
    assert_eq!(rows[1]["success"], false);
    assert_eq!(rows[1]["error_kind"], "UndefinedDerivation");
    for ratio in ["TG_HDL", "LDL_HDL", "Chol_HDL"] {
        assert!(rows[1]["errors"][ratio].is_string(), "{ratio}");
    }
}

#[tokio::test]
async fn test_upload_with_missing_columns_rejected() {
    let csv = "AGE,Urea,Cr\n50,4.7,46\n";
    let (status, json) = send_json(
        create_test_app(),
        multipart_upload("/v1/diabetes/predict", "panel.csv", csv),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "BatchRejected");
    assert_eq!(
        json["errors"]["general"],
        "Missing columns: HbA1c, Chol, TG, HDL, LDL, VLDL, BMI"
    );
}

#[tokio::test]
async fn test_non_csv_upload_rejected() {
    let (status, json) = send_json(
        create_test_app(),
        multipart_upload("/v1/crop/predict", "soil.xlsx", "N,P\n1,2\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"]["general"], "Only CSV files allowed.");
}

#[tokio::test]
async fn test_upload_extension_is_case_insensitive() {
    let csv = "Nitrogen,Phosphorus,Potassium,Temperature,Humidity,pH,Rainfall\n\
               90,42,43,20.8,82.0,6.5,202.9\n";
    let (status, json) = send_json(
        create_test_app(),
        multipart_upload("/v1/crop/predict", "SOIL.CSV", csv),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["crop"], "Rice");
}

#[tokio::test]
async fn test_row_limit_from_config() {
    let config = ServeConfig {
        max_batch_rows: 1,
        ..ServeConfig::default()
    };
    let app = create_router(AppState::new(
        PipelineRegistry::demo(&Vertical::ALL),
        config,
    ));
    let (status, json) = send_json(
        app,
        multipart_upload("/v1/diabetes/predict", "panel.csv", DIABETES_CSV),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"]["general"], "Too many rows: the limit is 1.");
}

#[tokio::test]
async fn test_body_limit_enforced() {
    let config = ServeConfig {
        max_upload_bytes: 64,
        ..ServeConfig::default()
    };
    let app = create_router(AppState::new(
        PipelineRegistry::demo(&Vertical::ALL),
        config,
    ));
    let response = app
        .oneshot(multipart_upload("/v1/diabetes/predict", "panel.csv", DIABETES_CSV))
        .await
        .expect("test");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_large_upload_runs_every_row() {
    let mut csv = String::from("AGE,Urea,Cr,HbA1c,Chol,TG,HDL,LDL,VLDL,BMI\n");
    for i in 0..500 {
        csv.push_str(&format!("{},4.7,46,4.9,4.2,0.9,2.4,1.4,0.5,24\n", 30 + i % 40));
    }
    let state = AppState::demo();
    let (status, json) = send_json(
        create_router(state.clone()),
        multipart_upload("/v1/diabetes/predict", "panel.csv", &csv),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_rows"], 500);
    assert_eq!(json["results"].as_array().expect("test").len(), 500);
    assert_eq!(json["results"][499]["row"], 500);
    assert_eq!(state.metrics().snapshot().batch_rows, 500);
}
