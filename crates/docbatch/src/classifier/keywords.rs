//! Keyword vocabularies and term matching for chunk classification.
//!
//! All lists are lowercase. Matching happens on lowercased content and
//! requires a word boundary on both sides, so `ash` does not fire inside
//! `washing`.

/// Product-sheet vocabulary. Excludes category nouns that collection
/// overviews also list ("seating", "tables").
pub const PRODUCT: &[&str] = &[
    "available in",
    "finish",
    "finishes",
    "upholstery",
    "chair",
    "chairs",
    "sofa",
    "armchair",
    "lamp",
    "shelf",
    "cabinet",
    "bench",
    "stool",
    "modular",
    "upholstered",
    "configuration",
    "configurations",
    "tile",
    "tiles",
    "porcelain",
    "size",
    "format",
];

/// "technical" is not a term: a "Technical Specifications" heading alone
/// stays below two hits.
pub const TECHNICAL: &[&str] = &[
    "specification",
    "specifications",
    "weight",
    "capacity",
    "thickness",
    "resistance",
    "tolerance",
    "load",
    "voltage",
    "wattage",
    "absorption",
    "density",
    "rating",
    "dimensions",
];

pub const VISUAL: &[&str] = &[
    "visual",
    "image",
    "images",
    "photo",
    "photography",
    "gallery",
    "moodboard",
    "aesthetic",
    "showcase",
    "render",
    "rendering",
    "illustration",
    "picture",
    "lookbook",
];

pub const DESIGNER: &[&str] = &[
    "designer",
    "designed",
    "design by",
    "studio",
    "philosophy",
    "inspired",
    "inspiration",
    "creative",
    "vision",
    "craftsmanship",
    "atelier",
    "architect",
];

pub const COLLECTION: &[&str] = &[
    "collection",
    "collections",
    "series",
    "range",
    "family",
    "lineup",
    "portfolio",
];

pub const INDEX: &[&str] = &["table of contents", "contents", "index", "chapter"];

pub const SUSTAINABILITY: &[&str] = &[
    "sustainability",
    "sustainable",
    "recycled",
    "recyclable",
    "eco-friendly",
    "environmental",
    "carbon",
    "renewable",
    "biodegradable",
    "responsible sourcing",
    "emissions",
    "circular",
];

pub const CERTIFICATION: &[&str] = &[
    "certified",
    "certification",
    "certificate",
    "compliance",
    "compliant",
    "standard",
    "standards",
    "iso",
    "ce marked",
    "tested",
    "approved",
];

pub const MATERIALS: &[&str] = &[
    "wood",
    "oak",
    "walnut",
    "ash",
    "beech",
    "leather",
    "fabric",
    "metal",
    "steel",
    "aluminum",
    "aluminium",
    "glass",
    "marble",
    "stone",
    "ceramic",
    "porcelain",
    "concrete",
    "brass",
    "copper",
    "plastic",
    "velvet",
    "linen",
    "wool",
    "cotton",
    "rattan",
    "bamboo",
];

pub const COLORS: &[&str] = &[
    "black",
    "white",
    "grey",
    "gray",
    "beige",
    "brown",
    "red",
    "blue",
    "green",
    "yellow",
    "natural",
    "charcoal",
    "anthracite",
    "ivory",
    "cream",
    "sand",
    "taupe",
    "navy",
];

/// Whether `term` occurs in `lower` as a whole word or phrase.
pub fn contains_term(lower: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric();
    lower.match_indices(term).any(|(start, _)| {
        let before = lower[..start].chars().next_back();
        let after = lower[start + term.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Number of distinct terms from `set` present in `lower`.
pub fn count_terms(lower: &str, set: &[&str]) -> usize {
    set.iter().filter(|term| contains_term(lower, term)).count()
}

/// Terms from `set` present in `lower`, in vocabulary order.
pub fn matching_terms(lower: &str, set: &[&str]) -> Vec<String> {
    set.iter()
        .filter(|term| contains_term(lower, term))
        .map(|term| term.to_string())
        .collect()
}
