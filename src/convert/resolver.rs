//! Link conversion resolver.
//!
//! Re-locates a recorded virtual link in the current document text and
//! returns verified offsets plus replacement text. Rendering can shift what
//! a table row looks like, so a stale position inside a table is recovered
//! by column index and cell similarity instead of row-text equality.
//!
//! Every path ends in an exact substring check. Nothing is applied on an
//! unverified position.

use tracing::{debug, info, instrument, warn};

use crate::config::LinkerSettings;
use crate::domain::{
    CellContext, Conversion, ConversionError, ConversionRequest, ConversionResult,
    DocumentId, ResolutionMethod,
};
use crate::surface::{line_bounds, DocumentSurface};
use crate::vocabulary::VocabularyIndex;

use super::link::LinkBuilder;
use super::similarity::{similarity, SIMILARITY_THRESHOLD};
use super::table::{cell_at, cell_content_offset, clean_cell, escape_cell_text, is_table_row, split_row};

/// Resolves conversion requests for one source document
#[derive(Debug, Clone)]
pub struct LinkConversionResolver<'a> {
    index: &'a VocabularyIndex,
    links: LinkBuilder<'a>,
}

impl<'a> LinkConversionResolver<'a> {
    pub fn new(index: &'a VocabularyIndex, links: LinkBuilder<'a>) -> Self {
        Self { index, links }
    }

    /// Resolver using the link style and format from settings
    pub fn from_settings(index: &'a VocabularyIndex, settings: &LinkerSettings) -> Self {
        Self::new(index, LinkBuilder::from_settings(index, settings))
    }

    /// Resolve links written into `document` (affects relative paths)
    pub fn for_document(mut self, document: &DocumentId) -> Self {
        self.links = self.links.for_source(document.as_str());
        self
    }

    /// Resolve one request against `text` without mutating anything
    pub fn resolve(&self, text: &str, request: &ConversionRequest) -> ConversionResult {
        let origin = request.origin_text.as_str();
        if origin.is_empty() {
            return Err(ConversionError::EmptyOrigin);
        }
        if !self.index.contains_target(&request.target) {
            return Err(ConversionError::UnknownTarget(request.target.clone()));
        }

        let (start, end, method) = if text.get(request.start..request.end) == Some(origin) {
            (request.start, request.end, ResolutionMethod::Direct)
        } else {
            let cell = request
                .cell
                .clone()
                .or_else(|| cell_context_at(text, request.start))
                .ok_or_else(|| ConversionError::TextMismatch {
                    start: request.start,
                    end: request.end,
                    origin: origin.to_string(),
                })?;
            relocate_in_table(text, origin, &cell)?
        };

        if text.get(start..end) != Some(origin) {
            return Err(ConversionError::VerificationFailed {
                start,
                end,
                expected: origin.to_string(),
            });
        }

        let (line_start, line_end) = line_bounds(text, start);
        let in_table = request.cell.is_some() || is_table_row(&text[line_start..line_end]);
        let replacement = self.links.build(
            &request.target,
            request.header_anchor.as_deref(),
            origin,
            in_table,
        );

        Ok(Conversion {
            new_start: start,
            new_end: end,
            replacement,
            method,
        })
    }

    /// Resolve and apply one request
    #[instrument(skip_all, fields(document = %doc.id(), origin = %request.origin_text))]
    pub fn convert<D>(&self, doc: &mut D, request: &ConversionRequest) -> ConversionResult
    where
        D: DocumentSurface + ?Sized,
    {
        let conversion = match self.resolve(doc.text(), request) {
            Ok(conversion) => conversion,
            Err(e) => {
                warn!(error = %e, "Conversion refused");
                return Err(e);
            }
        };

        doc.replace_range(&conversion.replacement, conversion.new_start, conversion.new_end)
            .map_err(|e| ConversionError::ReplaceFailed(e.to_string()))?;

        let at = doc.offset_to_position(conversion.new_start);
        info!(
            line = at.line,
            col = at.col,
            method = ?conversion.method,
            replacement = %conversion.replacement,
            "Converted virtual link"
        );
        Ok(conversion)
    }

    /// Resolve a batch against one snapshot of `text`.
    ///
    /// Results come back in request order. A result whose range overlaps an
    /// earlier-starting accepted result is turned into `Overlap`.
    pub fn resolve_batch(&self, text: &str, requests: &[ConversionRequest]) -> Vec<ConversionResult> {
        let mut results: Vec<ConversionResult> =
            requests.iter().map(|r| self.resolve(text, r)).collect();

        let mut accepted: Vec<(usize, usize, usize)> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().ok().map(|c| (c.new_start, c.new_end, i)))
            .collect();
        accepted.sort_unstable();

        let mut last_end = 0;
        for (start, end, i) in accepted {
            if start < last_end {
                results[i] = Err(ConversionError::Overlap { start, end });
            } else {
                last_end = end;
            }
        }
        results
    }

    /// Resolve every request against the pre-edit text, then apply the
    /// accepted ones from the end of the document backwards
    #[instrument(skip_all, fields(document = %doc.id(), requests = requests.len()))]
    pub fn convert_batch<D>(&self, doc: &mut D, requests: &[ConversionRequest]) -> Vec<ConversionResult>
    where
        D: DocumentSurface + ?Sized,
    {
        let mut results = self.resolve_batch(doc.text(), requests);

        let mut order: Vec<(usize, usize)> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().ok().map(|c| (c.new_start, i)))
            .collect();
        order.sort_unstable_by(|a, b| b.cmp(a));

        for (_, i) in order {
            let applied = match &results[i] {
                Ok(c) => doc.replace_range(&c.replacement, c.new_start, c.new_end),
                Err(_) => continue,
            };
            if let Err(e) = applied {
                results[i] = Err(ConversionError::ReplaceFailed(e.to_string()));
            }
        }

        let converted = results.iter().filter(|r| r.is_ok()).count();
        for (request, result) in requests.iter().zip(&results) {
            if let Err(e) = result {
                debug!(origin = %request.origin_text, error = %e, "Batch entry skipped");
            }
        }
        info!(converted, skipped = results.len() - converted, "Batch conversion finished");
        results
    }
}

/// Table cell holding `offset`, derived from the current text
fn cell_context_at(text: &str, offset: usize) -> Option<CellContext> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let (line_start, line_end) = line_bounds(text, offset);
    let (column, visible_text) = cell_at(&text[line_start..line_end], offset - line_start)?;
    Some(CellContext {
        column,
        visible_text,
    })
}

/// Find `origin` in the table row whose cell at `cell.column` best matches
/// the rendered cell text, falling back to the first table-ish line that
/// contains it
fn relocate_in_table(
    text: &str,
    origin: &str,
    cell: &CellContext,
) -> Result<(usize, usize, ResolutionMethod), ConversionError> {
    let visible = cell.visible_text.as_str();
    if !visible.contains(origin) && !visible.contains(&escape_cell_text(origin)) {
        return Err(ConversionError::OriginNotInCell(origin.to_string()));
    }

    // Raw cell 0 is whatever precedes the leading pipe
    let md_index = cell.column + 1;
    let mut best: Option<(usize, f64)> = None;
    let mut line_start = 0;

    for line in text.split('\n') {
        if is_table_row(line) {
            let content = split_row(line)
                .get(md_index)
                .map(|raw| raw.trim_start_matches(' '));
            if let Some((content, local)) =
                content.and_then(|c| c.find(origin).map(|local| (c, local)))
            {
                let score = similarity(&clean_cell(content), visible);
                if score > best.map_or(0.0, |(_, s)| s) {
                    if let Some(cell_start) = cell_content_offset(line, md_index) {
                        best = Some((line_start + cell_start + local, score));
                    }
                }
            }
        }
        line_start += line.len() + 1;
    }

    if let Some((start, score)) = best {
        if score > SIMILARITY_THRESHOLD {
            debug!(start, score, "Table row matched");
            return Ok((start, start + origin.len(), ResolutionMethod::TableRow));
        }
        debug!(score, "Best table row below threshold");
    }

    let mut line_start = 0;
    for line in text.split('\n') {
        if line.contains('|') {
            if let Some(local) = line.find(origin) {
                let start = line_start + local;
                return Ok((start, start + origin.len(), ResolutionMethod::LineFallback));
            }
        }
        line_start += line.len() + 1;
    }

    Err(ConversionError::NoCandidateRow(origin.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LinkFormat, LinkStyle, TargetId, TargetMeta};
    use crate::surface::InMemoryDocument;

    const TABLE: &str = "\
# Energy

| Process | Inputs | Outputs |
| --- | --- | --- |
| Respiration | Glucose and oxygen | ATP |
| Photosynthesis | [[Water|H2O]] and light | Glucose production |
";

    fn index() -> VocabularyIndex {
        let targets = vec![
            TargetMeta::new("Glucose.md"),
            TargetMeta::new("Photosynthesis.md"),
            TargetMeta::new("Water.md"),
        ];
        VocabularyIndex::build(&targets, &LinkerSettings::default())
    }

    fn request(text: &str, origin: &str, target: &str) -> ConversionRequest {
        let start = text.find(origin).unwrap();
        ConversionRequest {
            start,
            end: start + origin.len(),
            origin_text: origin.to_string(),
            target: TargetId::new(target),
            header_anchor: None,
            cell: None,
        }
    }

    #[test]
    fn test_direct_bare_link() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "Photosynthesis occurs in leaves";
        let conversion = resolver
            .resolve(text, &request(text, "Photosynthesis", "Photosynthesis.md"))
            .unwrap();
        assert_eq!((conversion.new_start, conversion.new_end), (0, 14));
        assert_eq!(conversion.replacement, "[[Photosynthesis]]");
        assert_eq!(conversion.method, ResolutionMethod::Direct);
    }

    #[test]
    fn test_stale_offsets_outside_table_fail() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "Some Glucose here";
        let mut req = request(text, "Glucose", "Glucose.md");
        req.start += 1;
        req.end += 1;
        assert!(matches!(
            resolver.resolve(text, &req),
            Err(ConversionError::TextMismatch { .. })
        ));
    }

    #[test]
    fn test_table_row_by_column_and_similarity() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());

        // Offsets recorded against rendered text no longer line up
        let req = ConversionRequest {
            start: 3,
            end: 10,
            origin_text: "Glucose".to_string(),
            target: TargetId::new("Glucose.md"),
            header_anchor: None,
            cell: None,
        }
        .with_cell(2, "Glucose production");

        let conversion = resolver.resolve(TABLE, &req).unwrap();
        let expected = TABLE.find("Glucose production").unwrap();
        assert_eq!(conversion.new_start, expected);
        assert_eq!(&TABLE[conversion.new_start..conversion.new_end], "Glucose");
        assert_eq!(conversion.method, ResolutionMethod::TableRow);
        assert_eq!(conversion.replacement, "[[Glucose]]");
    }

    #[test]
    fn test_cell_context_derived_from_text() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());

        // Stale offset still lands inside the Outputs cell of the last row
        let cell_start = TABLE.find("Glucose production").unwrap();
        let req = ConversionRequest {
            start: cell_start + 3,
            end: cell_start + 10,
            origin_text: "Glucose".to_string(),
            target: TargetId::new("Glucose.md"),
            header_anchor: None,
            cell: None,
        };
        let conversion = resolver.resolve(TABLE, &req).unwrap();
        assert_eq!(conversion.new_start, cell_start);
        assert_eq!(conversion.method, ResolutionMethod::TableRow);
    }

    #[test]
    fn test_origin_not_in_rendered_cell() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let mut req = request(TABLE, "Glucose", "Glucose.md").with_cell(2, "ATP");
        req.start = 0;
        req.end = 7;
        assert_eq!(
            resolver.resolve(TABLE, &req),
            Err(ConversionError::OriginNotInCell("Glucose".to_string()))
        );
    }

    #[test]
    fn test_line_fallback_below_threshold() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "| a | Glucose |\n";
        let req = ConversionRequest {
            start: 0,
            end: 7,
            origin_text: "Glucose".to_string(),
            target: TargetId::new("Glucose.md"),
            header_anchor: None,
            cell: None,
        }
        // Column 0 never holds the origin, so the row scan finds nothing
        .with_cell(0, "Glucose and many other unrelated words");

        let conversion = resolver.resolve(text, &req).unwrap();
        assert_eq!(conversion.method, ResolutionMethod::LineFallback);
        assert_eq!(conversion.new_start, 6);
    }

    #[test]
    fn test_no_candidate_row() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "| a | b |\n";
        let req = ConversionRequest {
            start: 0,
            end: 7,
            origin_text: "Glucose".to_string(),
            target: TargetId::new("Glucose.md"),
            header_anchor: None,
            cell: None,
        }
        .with_cell(0, "Glucose");
        assert_eq!(
            resolver.resolve(text, &req),
            Err(ConversionError::NoCandidateRow("Glucose".to_string()))
        );
    }

    #[test]
    fn test_rejects_empty_origin_and_unknown_target() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "Nucleus";
        let mut req = request(text, "Nucleus", "Nucleus.md");
        assert!(matches!(
            resolver.resolve(text, &req),
            Err(ConversionError::UnknownTarget(_))
        ));
        req.origin_text.clear();
        assert_eq!(resolver.resolve(text, &req), Err(ConversionError::EmptyOrigin));
    }

    #[test]
    fn test_convert_applies_verified_replacement() {
        let index = index();
        let resolver = LinkConversionResolver::new(
            &index,
            LinkBuilder::new(&index, LinkStyle::Markdown, LinkFormat::Shortest),
        );
        let mut doc = InMemoryDocument::new("Notes/Leaf.md", "Leaves make glucose daily");
        let req = request(doc.text(), "glucose", "Glucose.md");

        let conversion = resolver.convert(&mut doc, &req).unwrap();
        assert_eq!(doc.text(), "Leaves make [glucose](Glucose) daily");
        let end = conversion.new_start + conversion.replacement.len();
        assert_eq!(&doc.text()[conversion.new_start..end], conversion.replacement);
    }

    #[test]
    fn test_batch_applies_in_descending_order() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "Water and Glucose feed Photosynthesis";
        let mut doc = InMemoryDocument::new("Note.md", text);
        let requests = vec![
            request(text, "Water", "Water.md"),
            request(text, "Glucose", "Glucose.md"),
            request(text, "Photosynthesis", "Photosynthesis.md"),
        ];

        let results = resolver.convert_batch(&mut doc, &requests);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(doc.text(), "[[Water]] and [[Glucose]] feed [[Photosynthesis]]");
    }

    #[test]
    fn test_batch_rejects_overlap() {
        let index = index();
        let resolver = LinkConversionResolver::from_settings(&index, &LinkerSettings::default());
        let text = "Glucose";
        let mut doc = InMemoryDocument::new("Note.md", text);
        let requests = vec![
            request(text, "Glucose", "Glucose.md"),
            request(text, "Glucose", "Glucose.md"),
        ];

        let results = resolver.convert_batch(&mut doc, &requests);
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(ConversionError::Overlap { start: 0, end: 7 }));
        assert_eq!(doc.text(), "[[Glucose]]");
    }
}
