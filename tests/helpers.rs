#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Build a one-page PDF with a real text layer so processing takes the
/// digital path and never touches pdftoppm or tesseract.
pub fn build_pdf(text: &str) -> Vec<u8> {
    build_pdf_pages(&[text], 12)
}

/// Build a PDF with one page per entry. With short page texts the digital
/// layer stays under the acceptance minimum, forcing the OCR fallback; a
/// large font size keeps the rendered words legible to the engine.
pub fn build_pdf_pages(pages: &[&str], font_size: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        // PDF strings carry no line breaks; emit one positioned text block
        // per line so extraction sees the lines separately, as it would in
        // a PDF from a real generator.
        let mut operations = Vec::new();
        for (line_number, line) in text.lines().enumerate() {
            let y = 600 - (line_number as i64) * (font_size + 4);
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), font_size.into()]),
                Operation::new("Td", vec![72.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

pub fn invoice_pdf() -> Vec<u8> {
    build_pdf(
        "Invoice Number: INV-2024-001\n\
         Invoice Date: 01/15/2024\n\
         Due Date: 02/15/2024\n\
         Bill To: Acme Industrial Supply\n\
         Subtotal: $1,000.00\n\
         Tax: $200.50\n\
         Total: $1,200.50\n",
    )
}

pub fn bank_statement_pdf() -> Vec<u8> {
    build_pdf(
        "First Example Bank\n\
         Account Number: 1234-5678\n\
         Statement Period: 01/01/2024 to 01/31/2024\n\
         Opening Balance: $4,000.00\n\
         Current Balance: $9,876.54\n\
         Thank you for banking with us.\n",
    )
}
