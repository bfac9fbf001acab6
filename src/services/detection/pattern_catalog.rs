// Pattern Catalog
// Static registration table: category -> detectors, description, generic advice.
// Adding a category means adding a row here; the matcher never special-cases one.

use crate::models::BiasCategory;

/// One registry row. Patterns are evaluated case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub category: BiasCategory,
    pub patterns: &'static [&'static str],
    pub description: &'static str,
    /// Generic improvement advice used when the semantic layer has none.
    pub advice: &'static str,
    /// Words whose presence anywhere in the text raises confidence for this category.
    pub boosters: &'static [&'static str],
}

pub static CATEGORY_REGISTRY: &[CategorySpec] = &[
    CategorySpec {
        category: BiasCategory::ConfirmationBias,
        patterns: &[
            r"\bthis\s+(?:just\s+)?proves\s+(?:what\s+)?i\s+(?:always\s+)?(?:said|knew|thought)\b",
            r"\bi\s+knew\s+it\s+all\s+along\b",
            r"\bi\s+only\s+(?:read|trust|listen\s+to)\b",
            r"\bignore\s+(?:the|any)\s+(?:evidence|data)\s+(?:that|which)\b",
        ],
        description: "Tendency to search for, interpret, and recall information that confirms pre-existing beliefs",
        advice: "Look for evidence that could disprove your view, not only evidence that supports it.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::AdHominem,
        patterns: &[
            r"\byou['’]?re\s+(?:(?:clearly|just|such|so|really|obviously)\s+)*(?:an?\s+)?(?:stupid|idiot|moron|dumb|fool|ignorant)\b",
            r"\bonly\s+an?\s+(?:idiot|fool|moron)\s+would\b",
            r"\bcoming\s+from\s+someone\s+who\b",
            r"\byou\s+clearly\s+don['’]?t\s+understand\b",
            r"\bты\s+(?:просто\s+)?(?:идиот|дурак|тупой)\b",
        ],
        description: "Attacking the person making an argument rather than the argument itself",
        advice: "Address the argument itself rather than the person making it.",
        boosters: &["argument", "point", "claim"],
    },
    CategorySpec {
        category: BiasCategory::Strawman,
        patterns: &[
            r"\bso\s+you['’]?re\s+saying\b",
            r"\bwhat\s+you\s+really\s+mean\s+is\b",
            r"\bif\s+we\s+follow\s+your\s+logic\b",
            r"\bby\s+that\s+logic\b",
            r"\bто\s+есть\s+ты\s+хочешь\s+сказать\b",
        ],
        description: "Misrepresenting someone's argument to make it easier to attack",
        advice: "Restate the other position in a form its author would agree with before responding.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::FalseDichotomy,
        patterns: &[
            r"\beither\b.+\bor\b.+there['’]?s\s+no\s+middle\s+ground",
            r"\byou['’]?re\s+either\b.+\bor\b",
            r"\bif\s+you['’]?re\s+not\b.+,\s*(?:then\s+)?you\s+must\s+be\b",
            r"\bthere\s+are\s+only\s+two\s+options\b",
            r"\bwith\s+us\s+or\s+against\s+us\b",
        ],
        description: "Presenting only two options when more exist",
        advice: "Consider whether there are options between or beyond the two presented.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::AppealToAuthority,
        patterns: &[
            r"\bexperts\s+say\b",
            r"\bstudies\s+show\b",
            r"\bscientists\s+agree\b",
            r"\baccording\s+to\s+(?:the\s+)?experts\b",
            r"\bуч[её]ные\s+доказали\b",
        ],
        description: "Using authority as evidence without proper justification",
        advice: "Cite the specific source and explain why its evidence supports the claim.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::Bandwagon,
        patterns: &[
            r"\beveryone\s+knows\b",
            r"\bmost\s+people\s+agree\b",
            r"\bit['’]?s\s+common\s+knowledge\b",
            r"\beverybody\s+does\s+it\b",
            r"\bвсе\s+знают\b",
            r"\bвсем\s+известно\b",
        ],
        description: "Believing something because many others believe it",
        advice: "Support the claim with evidence rather than with how many people hold it.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::SlipperySlope,
        patterns: &[
            r"\bnext\s+thing\s+you\s+know\b",
            r"\bwhere\s+does\s+it\s+(?:end|stop)\b",
            r"\bit['’]?s\s+a\s+slippery\s+slope\b",
            r"\bif\s+we\s+allow\b.+\bthen\s+soon\b",
        ],
        description: "Assuming one event will lead to a chain of negative consequences",
        advice: "Show evidence for each step of the predicted chain of consequences.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::CircularReasoning,
        patterns: &[
            r"\bit['’]?s\s+true\s+because\b.+\bsays\s+so\b",
            r"\bbecause\s+it\s+just\s+is\b",
            r"\bby\s+definition\s+it\s+must\s+be\b",
        ],
        description: "Using the conclusion as evidence for the premise",
        advice: "Give a reason for the conclusion that does not already assume it.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::HastyGeneralization,
        patterns: &[
            r"\ball\s+(?:of\s+)?(?:them|those\s+people)\s+are\b",
            r"\bthey\s+always\b",
            r"\bi\s+know\s+someone\s+who\b.+\bso\b",
            r"\bnever\s+works\b",
        ],
        description: "Drawing broad conclusions from limited examples",
        advice: "Check whether the examples are representative before generalizing.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::SurvivorshipBias,
        patterns: &[
            r"\b(?:he|she|they)\s+dropped\s+out\s+and\s+(?:became|got)\s+(?:rich|successful|a\s+billionaire)",
            r"\bif\s+(?:he|she|they)\s+could\s+do\s+it,?\s+(?:anyone|so\s+can\s+you)",
            r"\bsuccessful\s+people\s+all\b",
        ],
        description: "Focusing on successful examples while ignoring failures",
        advice: "Ask how many tried the same thing and failed.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::AnchoringBias,
        patterns: &[
            r"\boriginally\s+(?:priced|listed)\s+at\b",
            r"\bcompared\s+to\s+the\s+first\s+(?:offer|price|estimate)\b",
            r"\bstarting\s+from\s+the\s+initial\s+(?:number|figure|estimate)\b",
        ],
        description: "Over-relying on the first piece of information encountered",
        advice: "Re-evaluate using independent reference points, not the first number you saw.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::AvailabilityHeuristic,
        patterns: &[
            r"\bi\s+(?:just\s+)?saw\s+(?:it\s+)?on\s+the\s+news\b",
            r"\byou\s+keep\s+hearing\s+about\b",
            r"\bit\s+happens\s+all\s+the\s+time\b",
        ],
        description: "Overestimating likelihood based on memorable examples",
        advice: "Compare against base rates instead of memorable examples.",
        boosters: &[],
    },
    CategorySpec {
        category: BiasCategory::AffirmingTheConsequent,
        patterns: &[
            r"\b(?:every|all)\s+\w+\s+(?:is|are)\s+(?:an?\s+)?\w+,\s*(?:so|therefore|hence)\s+(?:every|all)\s+\w+\s+(?:is|are)\b",
            r"\bвсяк\w*\s+\w+\s+\w+\s*,\s*значит\s+всяк\w*\s+\w+",
        ],
        description: "Reversing a conditional: concluding that because every A is B, every B is A",
        advice: "Check whether the statement still holds when its direction is reversed.",
        boosters: &[],
    },
];

pub fn category_spec(category: BiasCategory) -> Option<&'static CategorySpec> {
    CATEGORY_REGISTRY.iter().find(|spec| spec.category == category)
}

pub fn description(category: BiasCategory) -> &'static str {
    category_spec(category)
        .map(|spec| spec.description)
        .unwrap_or("Reasoning pattern that may weaken the argument")
}

pub fn advice(category: BiasCategory) -> &'static str {
    category_spec(category)
        .map(|spec| spec.advice)
        .unwrap_or("Support the claim with evidence and address the argument directly.")
}
