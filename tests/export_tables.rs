// tests/export_tables.rs
//
// CSV and XLSX exports of classified batches, read back with csv/calamine.

use std::io::Cursor;
use std::sync::Arc;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use smart_triggers::batch::{classify_batch, ClassificationResult};
use smart_triggers::export::csv::UTF8_BOM;
use smart_triggers::export::excel::{RESULTS_SHEET, TONE_SHEET};
use smart_triggers::export::{to_csv, to_xlsx, Delimiter, TableLayout};
use smart_triggers::tone::summarize;
use smart_triggers::{TriggerClassifier, TriggerConfig};

async fn sample() -> (TriggerClassifier, Vec<ClassificationResult>) {
    let c = TriggerClassifier::local_only(Arc::new(TriggerConfig::builtin().unwrap()));
    let rows = classify_batch(
        &c,
        ["надоела эта парковка", "супер, спасибо", "погода \"так себе\""],
    )
    .await
    .unwrap();
    (c, rows)
}

#[tokio::test]
async fn csv_export_reads_back_with_cyrillic_intact() {
    let (c, rows) = sample().await;
    let layout = TableLayout::for_config(c.config());
    let bytes = to_csv(&rows, layout, Delimiter::Semicolon).unwrap();
    assert!(bytes.starts_with(UTF8_BOM));

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(&bytes[UTF8_BOM.len()..]);
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["id", "text", "triggers", "label", "confidence", "tone", "final_label"]
    );

    let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 3);

    assert_eq!(&records[0][0], "1");
    assert_eq!(&records[0][1], "надоела эта парковка");
    assert_eq!(&records[0][2], "negative, complaint");
    assert_eq!(&records[0][3], "negative");
    assert_eq!(&records[0][4], "78.00");
    assert_eq!(&records[0][5], "negative");

    assert_eq!(&records[2][1], "погода \"так себе\"");
    assert_eq!(&records[2][3], "neutral");
    assert_eq!(&records[2][4], "40.00");
}

#[tokio::test]
async fn csv_layout_drops_optional_columns_without_tone_or_threshold() {
    let cfg = TriggerConfig::builder()
        .trigger("spam", ["казино"])
        .build()
        .unwrap();
    let c = TriggerClassifier::local_only(Arc::new(cfg));
    let rows = classify_batch(&c, ["казино"]).await.unwrap();

    let bytes = to_csv(&rows, TableLayout::for_config(c.config()), Delimiter::Comma).unwrap();
    let body = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
    assert_eq!(
        body,
        "id,text,triggers,label,confidence\n1,казино,spam,spam,78.00\n"
    );
}

#[tokio::test]
async fn xlsx_export_has_results_and_tone_sheets() {
    let (c, rows) = sample().await;
    let tones = c.config().tone_map().unwrap();
    let summary = summarize(&rows, tones);
    let bytes = to_xlsx(&rows, &summary, TableLayout::for_config(c.config())).unwrap();

    let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes)).expect("open xlsx");
    assert_eq!(wb.sheet_names(), vec![RESULTS_SHEET.to_string(), TONE_SHEET.to_string()]);

    let results = wb.worksheet_range(RESULTS_SHEET).expect("results sheet");
    assert_eq!(results.height(), 4, "header + 3 rows");
    assert_eq!(
        results.get_value((1, 1)),
        Some(&Data::String("надоела эта парковка".into()))
    );
    assert_eq!(results.get_value((1, 4)), Some(&Data::Float(78.0)));

    let tone = wb.worksheet_range(TONE_SHEET).expect("tone sheet");
    assert_eq!(tone.height(), 1 + summary.len());
    assert_eq!(tone.get_value((0, 2)), Some(&Data::String("percent".into())));
}
