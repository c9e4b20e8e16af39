//! Raw text extraction from uploaded resume documents.

use bytes::Bytes;

use crate::errors::AppError;
use crate::models::resume::FileType;

/// Extracts plain text from a resume document.
///
/// Extraction is CPU-bound and some PDF producers make `pdf-extract` panic, so it
/// runs on the blocking pool; a panic there surfaces as `ParseFailure`.
pub async fn extract_text(
    file_ref: &str,
    bytes: Bytes,
    file_type: FileType,
) -> Result<String, AppError> {
    let failure = |reason: String| AppError::ParseFailure {
        file_ref: file_ref.to_string(),
        reason,
    };

    if bytes.is_empty() {
        return Err(failure("document is empty".to_string()));
    }

    let text = tokio::task::spawn_blocking(move || extract_sync(&bytes, file_type))
        .await
        .map_err(|e| failure(format!("extractor aborted: {e}")))?
        .map_err(failure)?;

    if text.trim().is_empty() {
        return Err(failure("document contains no extractable text".to_string()));
    }
    Ok(text)
}

fn extract_sync(data: &[u8], file_type: FileType) -> Result<String, String> {
    match file_type {
        FileType::Pdf => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| format!("unreadable PDF: {e}")),
        FileType::Docx => extract_docx(data),
        FileType::Txt => {
            String::from_utf8(data.to_vec()).map_err(|e| format!("text is not UTF-8: {e}"))
        }
        FileType::Doc => Err("legacy .doc documents are not supported, upload PDF or DOCX".to_string()),
    }
}

fn extract_docx(data: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(data).map_err(|e| format!("unreadable DOCX: {e}"))?;
    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for pc in p.children {
                if let docx_rs::ParagraphChild::Run(run) = pc {
                    for rc in run.children {
                        if let docx_rs::RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let text = extract_text("r/1.txt", Bytes::from_static(b"Jane Doe\nSkills: Rust"), FileType::Txt)
            .await
            .unwrap();
        assert!(text.contains("Jane Doe"));
    }

    fn docx(paragraphs: &[&str]) -> Bytes {
        let mut doc = docx_rs::Docx::new();
        for text in paragraphs {
            doc = doc.add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)));
        }
        let mut out = std::io::Cursor::new(Vec::new());
        doc.build().pack(&mut out).unwrap();
        Bytes::from(out.into_inner())
    }

    /// Single-page PDF showing `line` in Helvetica, with a correct xref table.
    fn pdf(line: &str) -> Bytes {
        let content = format!("BT /F1 12 Tf 72 720 Td ({line}) Tj ET");
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }
        let xref = out.len();
        out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            out.push_str(&format!("{offset:010} 00000 n \n"));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));
        Bytes::from(out)
    }

    #[tokio::test]
    async fn test_docx_paragraphs_become_lines() {
        let text = extract_text(
            "r/6.docx",
            docx(&["Jane Doe", "Skills", "Rust, PostgreSQL"]),
            FileType::Docx,
        )
        .await
        .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["Jane Doe", "Skills", "Rust, PostgreSQL"]);
    }

    #[tokio::test]
    async fn test_pdf_text_is_extracted() {
        let text = extract_text("r/7.pdf", pdf("Jane Doe"), FileType::Pdf).await.unwrap();
        let squashed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert!(squashed.contains("JaneDoe"), "extracted {text:?}");
    }

    #[tokio::test]
    async fn test_empty_document_is_parse_failure_with_file_ref() {
        let err = extract_text("resumes/7/empty.pdf", Bytes::new(), FileType::Pdf)
            .await
            .unwrap_err();
        match err {
            AppError::ParseFailure { file_ref, .. } => assert_eq!(file_ref, "resumes/7/empty.pdf"),
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_parse_failure() {
        let err = extract_text("r/2.txt", Bytes::from_static(b"  \n\t "), FileType::Txt)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_legacy_doc_is_unsupported() {
        let err = extract_text("r/3.doc", Bytes::from_static(b"\xd0\xcf\x11\xe0"), FileType::Doc)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseFailure { reason, .. } if reason.contains(".doc")));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_parse_failure() {
        let err = extract_text("r/4.pdf", Bytes::from_static(b"not a pdf at all"), FileType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_garbage_docx_is_parse_failure() {
        let err = extract_text("r/5.docx", Bytes::from_static(b"PK\x03\x04broken"), FileType::Docx)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseFailure { .. }));
    }
}
