//! Integration tests for the extraction router with fake engines.
//!
//! The fakes count every call so tests can assert which stages ran, e.g.
//! that a PDF with a text layer never reaches OCR.

use image::{DynamicImage, ImageFormat};
use rxscan::{
    extract_async, DocumentKind, ExtractionConfig, ExtractionOutcome, Extractor, OcrEngine,
    OcrProfile, PdfBackend, PdfHandle, RawDocument, ScanError, OCR_UNAVAILABLE_MESSAGE,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Calls {
    opens: AtomicUsize,
    page_text: AtomicUsize,
    renders: AtomicUsize,
    highest_text_page: AtomicUsize,
    ocr: AtomicUsize,
}

impl Calls {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct FakePdf {
    /// Text layer per page; its length is the page count.
    pages: Vec<String>,
    opens_ok: bool,
    renders_ok: bool,
    calls: Arc<Calls>,
}

impl FakePdf {
    fn with_text(pages: &[&str], calls: &Arc<Calls>) -> Self {
        Self {
            pages: pages.iter().map(|s| s.to_string()).collect(),
            opens_ok: true,
            renders_ok: true,
            calls: Arc::clone(calls),
        }
    }

    fn scanned(page_count: usize, calls: &Arc<Calls>) -> Self {
        Self::with_text(&vec![""; page_count], calls)
    }
}

impl PdfBackend for FakePdf {
    fn is_available(&self) -> bool {
        true
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfHandle + 'a>, ScanError> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        if !self.opens_ok || !bytes.starts_with(b"%PDF") {
            return Err(ScanError::MalformedPdf("not a PDF".into()));
        }
        Ok(Box::new(FakeDoc { pdf: self }))
    }
}

struct FakeDoc<'a> {
    pdf: &'a FakePdf,
}

impl PdfHandle for FakeDoc<'_> {
    fn page_count(&self) -> usize {
        self.pdf.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, ScanError> {
        self.pdf.calls.page_text.fetch_add(1, Ordering::SeqCst);
        self.pdf
            .calls
            .highest_text_page
            .fetch_max(index + 1, Ordering::SeqCst);
        Ok(self.pdf.pages[index].clone())
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, ScanError> {
        self.pdf.calls.renders.fetch_add(1, Ordering::SeqCst);
        assert_eq!(dpi, 300);
        if !self.pdf.renders_ok {
            return Err(ScanError::RenderFailed {
                page: index + 1,
                detail: "out of memory".into(),
            });
        }
        Ok(DynamicImage::new_rgb8(64, 64))
    }
}

/// Answers every profile with `default`, or per page-seg-mode overrides.
/// `None` confidences make the confidence branch fail for that profile.
struct FakeOcr {
    available: bool,
    default: (Option<Vec<f32>>, &'static str),
    by_psm: HashMap<u8, (Option<Vec<f32>>, &'static str)>,
    calls: Arc<Calls>,
}

impl FakeOcr {
    fn reading(text: &'static str, calls: &Arc<Calls>) -> Self {
        Self {
            available: true,
            default: (Some(vec![80.0]), text),
            by_psm: HashMap::new(),
            calls: Arc::clone(calls),
        }
    }

    fn missing(calls: &Arc<Calls>) -> Self {
        Self {
            available: false,
            ..Self::reading("", calls)
        }
    }

    fn answer(&self, profile: &OcrProfile) -> &(Option<Vec<f32>>, &'static str) {
        self.by_psm
            .get(&profile.page_seg_mode)
            .unwrap_or(&self.default)
    }
}

impl OcrEngine for FakeOcr {
    fn is_available(&self) -> bool {
        self.available
    }

    fn token_confidences(
        &self,
        _image: &DynamicImage,
        profile: &OcrProfile,
    ) -> Result<Vec<f32>, ScanError> {
        self.calls.ocr.fetch_add(1, Ordering::SeqCst);
        self.answer(profile)
            .0
            .clone()
            .ok_or_else(|| ScanError::OcrFailed("tsv unavailable".into()))
    }

    fn recognize(&self, _image: &DynamicImage, profile: &OcrProfile) -> Result<String, ScanError> {
        self.calls.ocr.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer(profile).1.to_string())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const PDF_BYTES: &[u8] = b"%PDF-1.7 fake";

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn extractor(pdf: FakePdf, ocr: FakeOcr) -> Extractor {
    Extractor::new(Box::new(pdf), Box::new(ocr), ExtractionConfig::default())
}

// ── Router ───────────────────────────────────────────────────────────────────

#[test]
fn empty_bytes_are_empty_for_both_kinds() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::with_text(&["text"], &calls),
        FakeOcr::reading("text", &calls),
    );

    assert_eq!(ex.extract(&[], DocumentKind::Pdf), ExtractionOutcome::Empty);
    assert_eq!(ex.extract(&[], DocumentKind::Image), ExtractionOutcome::Empty);
    assert_eq!(Calls::get(&calls.opens), 0);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn extraction_is_idempotent() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::scanned(3, &calls),
        FakeOcr::reading("Warfarin 5mg", &calls),
    );
    let doc = RawDocument::new(PDF_BYTES.to_vec(), DocumentKind::Pdf);

    let first = ex.extract_document(&doc);
    let second = ex.extract_document(&doc);
    assert_eq!(first, second);
    assert!(first.has_text());

    let image = png(32, 32);
    assert_eq!(
        ex.extract(&image, DocumentKind::Image),
        ex.extract(&image, DocumentKind::Image)
    );
}

#[tokio::test]
async fn async_wrapper_runs_the_same_pipeline() {
    let calls = Arc::new(Calls::default());
    let ex = Arc::new(extractor(
        FakePdf::with_text(&["Atorvastatin 20mg"], &calls),
        FakeOcr::reading("", &calls),
    ));

    let outcome = extract_async(Arc::clone(&ex), PDF_BYTES.to_vec(), DocumentKind::Pdf)
        .await
        .unwrap();
    assert_eq!(outcome, ExtractionOutcome::Text("Atorvastatin 20mg".into()));
}

// ── PDF pipeline ─────────────────────────────────────────────────────────────

#[test]
fn text_layer_skips_ocr() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::with_text(&["Rx: Amoxicillin 500mg", "", "Take 3x daily\x0c"], &calls),
        FakeOcr::reading("should not be used", &calls),
    );

    let outcome = ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert_eq!(
        outcome,
        ExtractionOutcome::Text("Rx: Amoxicillin 500mg\nTake 3x daily".into())
    );
    assert_eq!(Calls::get(&calls.ocr), 0);
    assert_eq!(Calls::get(&calls.renders), 0);
}

#[test]
fn empty_text_layer_falls_back_to_ocr() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::scanned(2, &calls),
        FakeOcr::reading("Metformin 850mg", &calls),
    );

    let outcome = ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert_eq!(
        outcome,
        ExtractionOutcome::Text("Metformin 850mg\nMetformin 850mg".into())
    );
    assert_eq!(Calls::get(&calls.renders), 2);
    assert!(Calls::get(&calls.ocr) > 0);
    // The handle from the text-layer pass is reused.
    assert_eq!(Calls::get(&calls.opens), 1);
}

#[test]
fn text_layer_reads_only_first_fifty_pages() {
    let calls = Arc::new(Calls::default());
    let pages: Vec<&str> = vec!["page"; 60];
    let ex = extractor(
        FakePdf::with_text(&pages, &calls),
        FakeOcr::reading("", &calls),
    );

    let outcome = ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert!(outcome.has_text());
    assert_eq!(outcome.as_text().lines().count(), 50);
    assert_eq!(Calls::get(&calls.page_text), 50);
    assert_eq!(Calls::get(&calls.highest_text_page), 50);
}

#[test]
fn ocr_renders_at_most_twenty_pages() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::scanned(60, &calls),
        FakeOcr::reading("Lisinopril", &calls),
    );

    let outcome = ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert_eq!(outcome.as_text().lines().count(), 20);
    assert_eq!(Calls::get(&calls.renders), 20);
}

#[test]
fn ocr_cap_follows_a_lower_page_limit() {
    let calls = Arc::new(Calls::default());
    let config = ExtractionConfig::builder().max_pages(5).build().unwrap();
    let ex = Extractor::new(
        Box::new(FakePdf::scanned(60, &calls)),
        Box::new(FakeOcr::reading("x", &calls)),
        config,
    );

    ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert_eq!(Calls::get(&calls.renders), 5);
}

#[test]
fn unparseable_pdf_is_retried_then_empty() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(
        FakePdf::with_text(&["text"], &calls),
        FakeOcr::reading("text", &calls),
    );

    let outcome = ex.extract(b"GIF89a not a pdf", DocumentKind::Pdf);
    assert_eq!(outcome, ExtractionOutcome::Empty);
    assert_eq!(Calls::get(&calls.opens), 2);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn render_failure_is_empty() {
    let calls = Arc::new(Calls::default());
    let mut pdf = FakePdf::scanned(3, &calls);
    pdf.renders_ok = false;
    let ex = extractor(pdf, FakeOcr::reading("text", &calls));

    assert_eq!(ex.extract(PDF_BYTES, DocumentKind::Pdf), ExtractionOutcome::Empty);
    assert_eq!(Calls::get(&calls.renders), 1);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn zero_page_pdf_is_empty() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(0, &calls), FakeOcr::reading("x", &calls));
    assert_eq!(ex.extract(PDF_BYTES, DocumentKind::Pdf), ExtractionOutcome::Empty);
    assert_eq!(Calls::get(&calls.renders), 0);
}

#[test]
fn scanned_pdf_without_ocr_is_sentinel() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(2, &calls), FakeOcr::missing(&calls));

    let outcome = ex.extract(PDF_BYTES, DocumentKind::Pdf);
    assert_eq!(outcome, ExtractionOutcome::OcrUnavailable);
    assert_eq!(Calls::get(&calls.renders), 0);
}

#[test]
fn text_layer_pdf_does_not_need_ocr() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::with_text(&["Aspirin"], &calls), FakeOcr::missing(&calls));
    assert_eq!(
        ex.extract(PDF_BYTES, DocumentKind::Pdf),
        ExtractionOutcome::Text("Aspirin".into())
    );
}

// ── Image pipeline ───────────────────────────────────────────────────────────

#[test]
fn tiny_image_skips_ocr() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(0, &calls), FakeOcr::reading("text", &calls));

    assert_eq!(ex.extract(&png(9, 9), DocumentKind::Image), ExtractionOutcome::Empty);
    assert_eq!(ex.extract(&png(200, 5), DocumentKind::Image), ExtractionOutcome::Empty);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn undecodable_image_is_empty() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(0, &calls), FakeOcr::reading("text", &calls));
    assert_eq!(
        ex.extract(b"<svg xmlns='http://www.w3.org/2000/svg'/>", DocumentKind::Image),
        ExtractionOutcome::Empty
    );
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn image_without_ocr_is_sentinel_not_empty() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(0, &calls), FakeOcr::missing(&calls));

    let outcome = ex.extract(&png(64, 64), DocumentKind::Image);
    assert_eq!(outcome, ExtractionOutcome::OcrUnavailable);
    assert!(outcome.is_error());
    assert_eq!(outcome.as_text(), OCR_UNAVAILABLE_MESSAGE);
    assert_ne!(outcome.as_text(), "");
}

#[test]
fn highest_confidence_profile_wins() {
    let calls = Arc::new(Calls::default());
    let mut ocr = FakeOcr::reading("", &calls);
    ocr.default = (Some(vec![40.0]), "lbuprofen 2OOmg");
    ocr.by_psm.insert(3, (Some(vec![75.0, 75.0]), "Ibuprofen 200mg"));
    let ex = extractor(FakePdf::scanned(0, &calls), ocr);

    assert_eq!(
        ex.extract(&png(64, 64), DocumentKind::Image),
        ExtractionOutcome::Text("Ibuprofen 200mg".into())
    );
}

#[test]
fn unscored_text_selected_when_nothing_scored() {
    let calls = Arc::new(Calls::default());
    let mut ocr = FakeOcr::reading("", &calls);
    ocr.default = (Some(vec![-1.0]), "");
    ocr.by_psm.insert(8, (None, "Take with food daily"));
    let ex = extractor(FakePdf::scanned(0, &calls), ocr);

    assert_eq!(
        ex.extract(&png(64, 64), DocumentKind::Image),
        ExtractionOutcome::Text("Take with food daily".into())
    );
}

#[test]
fn blank_recognition_is_empty() {
    let calls = Arc::new(Calls::default());
    let ex = extractor(FakePdf::scanned(0, &calls), FakeOcr::reading("  \n", &calls));
    assert_eq!(ex.extract(&png(64, 64), DocumentKind::Image), ExtractionOutcome::Empty);
    // Five profiles, confidences and text for each.
    assert_eq!(Calls::get(&calls.ocr), 10);
}
