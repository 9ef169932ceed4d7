use std::collections::BTreeMap;

use super::errors::{DomainError, DomainResult};

/// Vocabulario COCO de YOLOv8, indexado por id de clase.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Correspondencia índice de etiqueta -> nombre de clase de un detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Interpreta la entrada de metadatos `names` que el exportador de YOLOv8 escribe en el
    /// grafo ONNX: un dict de Python como `{0: 'person', 1: 'bicycle'}`.
    pub fn from_metadata(raw: &str) -> DomainResult<Self> {
        let invalid = |why: &str| DomainError::Validation(format!("label metadata: {why}"));

        let body = raw
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| invalid("expected a {index: name} mapping"))?;

        let mut entries = BTreeMap::new();
        let mut rest = body.trim();
        while !rest.is_empty() {
            let (key, after) = rest.split_once(':').ok_or_else(|| invalid("missing `:`"))?;
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| invalid(&format!("bad index `{}`", key.trim())))?;

            let after = after.trim_start();
            let quote = after
                .chars()
                .next()
                .filter(|c| *c == '\'' || *c == '"')
                .ok_or_else(|| invalid("class name must be quoted"))?;
            let after = &after[1..];
            let end = after.find(quote).ok_or_else(|| invalid("unterminated class name"))?;
            entries.insert(index, after[..end].to_string());

            rest = after[end + 1..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
        }

        let Some((&max_index, _)) = entries.iter().next_back() else {
            return Err(invalid("no classes"));
        };
        let names = (0..=max_index)
            .map(|i| entries.remove(&i).unwrap_or_else(|| i.to_string()))
            .collect();
        Ok(Self::new(names))
    }

    /// Nombre de la clase `index`; los índices desconocidos se devuelven como número.
    pub fn name_of(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_has_eighty_classes_in_yolo_order() {
        let labels = LabelSet::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.name_of(0), "person");
        assert_eq!(labels.name_of(5), "bus");
        assert_eq!(labels.name_of(79), "toothbrush");
    }

    #[test]
    fn unknown_index_falls_back_to_number() {
        assert_eq!(LabelSet::coco().name_of(80), "80");
    }

    #[test]
    fn parses_exporter_metadata() {
        let labels =
            LabelSet::from_metadata("{0: 'person', 1: 'bicycle', 2: \"traffic light\"}").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.name_of(1), "bicycle");
        assert_eq!(labels.name_of(2), "traffic light");
    }

    #[test]
    fn metadata_gaps_are_filled_with_indices() {
        let labels = LabelSet::from_metadata("{0: 'cat', 3: 'dog'}").unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.name_of(2), "2");
        assert_eq!(labels.name_of(3), "dog");
    }

    #[test]
    fn rejects_malformed_metadata() {
        assert!(LabelSet::from_metadata("").is_err());
        assert!(LabelSet::from_metadata("{}").is_err());
        assert!(LabelSet::from_metadata("{0: person}").is_err());
        assert!(LabelSet::from_metadata("{zero: 'person'}").is_err());
        assert!(LabelSet::from_metadata("{0: 'person}").is_err());
    }
}
