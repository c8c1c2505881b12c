use super::*;

#[tokio::test]
async fn test_canonical_crop_form_is_rice() {
    let (status, json) = send_json(
        create_test_app(),
        form_post("/v1/crop/predict", &CROP_SAMPLE),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["crop"], "Rice");
    assert_eq!(json["prediction_code"], 1);
    assert_eq!(
        json["result"],
        "Rice is the best crop to be cultivated with these conditions"
    );
}

#[tokio::test]
async fn test_missing_potassium_reports_only_it() {
    let fields: Vec<_> = CROP_SAMPLE
        .iter()
        .filter(|(k, _)| *k != "Potassium")
        .map(|(k, v)| if *k == "Humidity" { (*k, "250") } else { (*k, *v) })
        .collect();
    let (status, json) = send_json(create_test_app(), form_post("/v1/crop/predict", &fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error_kind"], "MissingField");
    assert_eq!(
        json["errors"],
        serde_json::json!({"Potassium": "Potassium is required."})
    );
}

#[tokio::test]
async fn test_out_of_range_fields_all_reported() {
    let fields: Vec<_> = CROP_SAMPLE
        .iter()
        .map(|(k, v)| match *k {
            "pH" => (*k, "14.5"),
            "Rainfall" => (*k, "-3"),
            _ => (*k, *v),
        })
        .collect();
    let (status, json) = send_json(create_test_app(), form_post("/v1/crop/predict", &fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "OutOfRange");
    assert_eq!(json["errors"]["pH"], "Value must be between 0 and 14.");
    assert_eq!(json["errors"]["Rainfall"], "Value cannot be negative.");
}

#[tokio::test]
async fn test_json_diabetes_echoes_rounded_fields() {
    let body = serde_json::json!({
        "AGE": 50, "Urea": 4.125, "Cr": 46, "HbA1c": 4.9, "Chol": 4.2,
        "TG": 0.9, "HDL": 2.4, "LDL": 1.4, "VLDL": 0.5, "BMI": "24"
    });
    let request = Request::builder()
        .method("POST")
        .uri("/v1/diabetes/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("test");
    let (status, json) = send_json(create_test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Diagnosis_Result"], "Non-diabetic");
    assert_eq!(json["Urea"], 4.12);
    assert_eq!(json["BMI"], 24.0);
}

#[tokio::test]
async fn test_json_zero_hdl_is_undefined_derivation() {
    let body = serde_json::json!({
        "AGE": 50, "Urea": 4.7, "Cr": 46, "HbA1c": 4.9, "Chol": 4.2,
        "TG": 0.9, "HDL": 0, "LDL": 1.4, "VLDL": 0.5, "BMI": 24
    });
    let request = Request::builder()
        .method("POST")
        .uri("/v1/diabetes/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("test");
    let (status, json) = send_json(create_test_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "UndefinedDerivation");
    assert_eq!(
        json["errors"]["TG_HDL"],
        "Undefined: division by zero (HDL is 0)"
    );
}

#[tokio::test]
async fn test_json_array_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/liver/predict")
        .header("content-type", "application/json")
        .body(Body::from("[1, 2]"))
        .expect("test");
    let (status, json) = send_json(create_test_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"]["general"], "Request body must be a JSON object.");
}

#[tokio::test]
async fn test_invalid_numeric_form_value() {
    let fields: Vec<_> = CROP_SAMPLE
        .iter()
        .map(|(k, v)| if *k == "Nitrogen" { (*k, "lots") } else { (*k, *v) })
        .collect();
    let (status, json) = send_json(create_test_app(), form_post("/v1/crop/predict", &fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_kind"], "InvalidFormat");
    assert_eq!(json["errors"]["Nitrogen"], "Invalid numeric value");
}

#[tokio::test]
async fn test_multipart_text_fields_form_one_record() {
    const BOUNDARY: &str = "fields-boundary";
    let body: String = [
        ("Age", "30"),
        ("Gender", "0"),
        ("BMI", "22"),
        ("AlcoholConsumption", "2"),
        ("Smoking", "0"),
        ("GeneticRisk", "0"),
        ("PhysicalActivity", "6"),
        ("Diabetes", "0"),
        ("Hypertension", "0"),
        ("LiverFunctionTest", "40"),
    ]
    .iter()
    .map(|(k, v)| {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{k}\"\r\n\r\n{v}\r\n")
    })
    .chain(std::iter::once(format!("--{BOUNDARY}--\r\n")))
    .collect();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/liver/predict")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("test");
    let (status, json) = send_json(create_test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], "Absent");
}

#[tokio::test]
async fn test_empty_file_part_falls_back_to_text_fields() {
    const BOUNDARY: &str = "manual-entry-boundary";
    let fields = [
        ("AGE", "50"),
        ("Urea", "4.7"),
        ("Cr", "46"),
        ("HbA1c", "4.9"),
        ("Chol", "4.2"),
        ("TG", "0.9"),
        ("HDL", "2.4"),
        ("LDL", "1.4"),
        ("VLDL", "0.5"),
        ("BMI", "24"),
    ];
    let text_part = |(k, v): &(&str, &str)| {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{k}\"\r\n\r\n{v}\r\n")
    };
    let empty_file = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\r\n"
    );

    // Empty file input first, then after the text fields
    for file_first in [true, false] {
        let text: String = fields.iter().map(text_part).collect();
        let body = if file_first {
            format!("{empty_file}{text}--{BOUNDARY}--\r\n")
        } else {
            format!("{text}{empty_file}--{BOUNDARY}--\r\n")
        };
        let request = Request::builder()
            .method("POST")
            .uri("/v1/diabetes/predict")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .expect("test");
        let (status, json) = send_json(create_test_app(), request).await;
        assert_eq!(status, StatusCode::OK, "file_first={file_first}");
        assert_eq!(json["success"], true);
        assert_eq!(json["Diagnosis_Result"], "Non-diabetic");
    }
}

#[tokio::test]
async fn test_identical_requests_identical_bodies() {
    let app = create_test_app();
    let (_, first) = send_json(app.clone(), form_post("/v1/crop/predict", &CROP_SAMPLE)).await;
    let (_, second) = send_json(app, form_post("/v1/crop/predict", &CROP_SAMPLE)).await;
    assert_eq!(first, second);
}
