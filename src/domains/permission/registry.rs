use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Width of the permission field stored on every report.
///
/// The registry fills every bit. Adding a section beyond index 30 would spill
/// into the sign bit of the stored integer, so growing the registry is a
/// breaking change for stored reports.
pub const PERMISSION_BITS: usize = 31;

/// Id of the manager-only pseudo-section at the end of part 5
pub const PUBLISH_SECTION_ID: &str = "publish";

/// Id of the grouping tab that holds part 2's diagnostic sub-sections
pub const DIAGNOSTIC_GROUP_ID: &str = "diagnostic";

/// The five sequential parts of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Understanding,
    Priorities,
    Strategy,
    Performance,
    Communication,
}

impl Part {
    /// All parts in navigation order
    pub const ALL: [Part; 5] = [
        Part::Understanding,
        Part::Priorities,
        Part::Strategy,
        Part::Performance,
        Part::Communication,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Part::Understanding => 1,
            Part::Priorities => 2,
            Part::Strategy => 3,
            Part::Performance => 4,
            Part::Communication => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Part::Understanding),
            2 => Some(Part::Priorities),
            3 => Some(Part::Strategy),
            4 => Some(Part::Performance),
            5 => Some(Part::Communication),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Understanding => "understanding",
            Part::Priorities => "priorities",
            Part::Strategy => "strategy",
            Part::Performance => "performance",
            Part::Communication => "communication",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "understanding" => Some(Part::Understanding),
            "priorities" => Some(Part::Priorities),
            "strategy" => Some(Part::Strategy),
            "performance" => Some(Part::Performance),
            "communication" => Some(Part::Communication),
            _ => None,
        }
    }

    /// Display name of the part
    pub fn label(&self) -> &'static str {
        match self {
            Part::Understanding => "Understanding",
            Part::Priorities => "Defining priorities",
            Part::Strategy => "Setting strategy",
            Part::Performance => "Measuring performance",
            Part::Communication => "Communicating",
        }
    }

    /// Derived bit range of this part
    pub fn descriptor(&self) -> PartDescriptor {
        part_descriptor(*self)
    }
}

/// How a section is tied to the permission field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bit", rename_all = "snake_case")]
pub enum BitBinding {
    /// Granted to external advisors when this bit is set
    Bound(u8),
    /// Never granted through the field; only a manager on an editable report sees it
    ManagerOnly,
}

impl BitBinding {
    pub fn bit_index(&self) -> Option<u8> {
        match self {
            BitBinding::Bound(bit) => Some(*bit),
            BitBinding::ManagerOnly => None,
        }
    }
}

/// A leaf editable unit of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub part: Part,
    pub binding: BitBinding,
}

impl SectionDescriptor {
    const fn bound(id: &'static str, label: &'static str, part: Part, bit: u8) -> Self {
        Self { id, label, part, binding: BitBinding::Bound(bit) }
    }

    pub fn bit_index(&self) -> Option<u8> {
        self.binding.bit_index()
    }
}

/// Bit range occupied by a part, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartDescriptor {
    pub part: Part,
    pub start_bit: u8,
    pub end_bit: u8,
}

impl PartDescriptor {
    pub fn bits(&self) -> RangeInclusive<usize> {
        self.start_bit as usize..=self.end_bit as usize
    }

    pub fn len(&self) -> usize {
        (self.end_bit - self.start_bit) as usize + 1
    }
}

/// Second-level entry under part 2's diagnostic tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsectionDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub binding: BitBinding,
    pub items: &'static [SubsectionDescriptor],
}

const IMPACTS_BIT: u8 = 7;

static SECTIONS: [SectionDescriptor; PERMISSION_BITS] = [
    // Part 1
    SectionDescriptor::bound("company-profile", "Company profile", Part::Understanding, 0),
    SectionDescriptor::bound("mission", "Mission", Part::Understanding, 1),
    SectionDescriptor::bound("values", "Values", Part::Understanding, 2),
    SectionDescriptor::bound("governance", "Governance", Part::Understanding, 3),
    SectionDescriptor::bound("business-model", "Business model", Part::Understanding, 4),
    // Part 2
    SectionDescriptor::bound("diagnostic-context", "Context", Part::Priorities, 5),
    SectionDescriptor::bound("diagnostic-stakeholders", "Stakeholders", Part::Priorities, 6),
    SectionDescriptor::bound("diagnostic-impacts", "Impacts", Part::Priorities, IMPACTS_BIT),
    SectionDescriptor::bound("diagnostic-risks", "Risks and opportunities", Part::Priorities, 8),
    SectionDescriptor::bound("diagnostic-benchmark", "Benchmark", Part::Priorities, 9),
    SectionDescriptor::bound("materiality-analysis", "Materiality analysis", Part::Priorities, 10),
    SectionDescriptor::bound("materiality-matrix", "Materiality matrix", Part::Priorities, 11),
    SectionDescriptor::bound("priority-topics", "Priority topics", Part::Priorities, 12),
    // Part 3
    SectionDescriptor::bound("sustainability-goals", "Sustainability goals", Part::Strategy, 13),
    SectionDescriptor::bound("action-plan", "Action plan", Part::Strategy, 14),
    SectionDescriptor::bound("sdg-alignment", "SDG alignment", Part::Strategy, 15),
    SectionDescriptor::bound("policies", "Policies", Part::Strategy, 16),
    // Part 4
    SectionDescriptor::bound("environmental-indicators", "Environmental indicators", Part::Performance, 17),
    SectionDescriptor::bound("social-indicators", "Social indicators", Part::Performance, 18),
    SectionDescriptor::bound("governance-indicators", "Governance indicators", Part::Performance, 19),
    SectionDescriptor::bound("gri-index", "GRI content index", Part::Performance, 20),
    // Part 5
    SectionDescriptor::bound("cover", "Cover", Part::Communication, 21),
    SectionDescriptor::bound("letter-to-stakeholders", "Letter to stakeholders", Part::Communication, 22),
    SectionDescriptor::bound("methodology", "Methodology", Part::Communication, 23),
    SectionDescriptor::bound("highlights", "Highlights", Part::Communication, 24),
    SectionDescriptor::bound("case-studies", "Case studies", Part::Communication, 25),
    SectionDescriptor::bound("certifications", "Certifications", Part::Communication, 26),
    SectionDescriptor::bound("awards", "Awards", Part::Communication, 27),
    SectionDescriptor::bound("report-glossary", "Glossary", Part::Communication, 28),
    SectionDescriptor::bound("assurance", "External assurance", Part::Communication, 29),
    SectionDescriptor::bound("contacts", "Contacts", Part::Communication, 30),
];

static PUBLISH: SectionDescriptor = SectionDescriptor {
    id: PUBLISH_SECTION_ID,
    label: "Publish",
    part: Part::Communication,
    binding: BitBinding::ManagerOnly,
};

static IMPACT_ITEMS: [SubsectionDescriptor; 5] = [
    SubsectionDescriptor { id: "environmental", label: "Environmental", binding: BitBinding::Bound(IMPACTS_BIT), items: &[] },
    SubsectionDescriptor { id: "social", label: "Social", binding: BitBinding::Bound(IMPACTS_BIT), items: &[] },
    SubsectionDescriptor { id: "economic", label: "Economic", binding: BitBinding::Bound(IMPACTS_BIT), items: &[] },
    SubsectionDescriptor { id: "governance", label: "Governance", binding: BitBinding::Bound(IMPACTS_BIT), items: &[] },
    SubsectionDescriptor { id: "supply-chain", label: "Supply chain", binding: BitBinding::Bound(IMPACTS_BIT), items: &[] },
];

static DIAGNOSTIC_SUBSECTIONS: [SubsectionDescriptor; 5] = [
    SubsectionDescriptor { id: "context", label: "Context", binding: BitBinding::Bound(5), items: &[] },
    SubsectionDescriptor { id: "stakeholders", label: "Stakeholders", binding: BitBinding::Bound(6), items: &[] },
    SubsectionDescriptor { id: "impacts", label: "Impacts", binding: BitBinding::Bound(IMPACTS_BIT), items: &IMPACT_ITEMS },
    SubsectionDescriptor { id: "risks", label: "Risks and opportunities", binding: BitBinding::Bound(8), items: &[] },
    SubsectionDescriptor { id: "benchmark", label: "Benchmark", binding: BitBinding::Bound(9), items: &[] },
];

/// Every bit-bound section in ascending bit order (31 entries)
pub fn all_sections() -> &'static [SectionDescriptor] {
    &SECTIONS
}

/// Bit-bound sections of a part, ascending by bit index
pub fn sections_for_part(part: Part) -> Vec<&'static SectionDescriptor> {
    SECTIONS.iter().filter(|s| s.part == part).collect()
}

/// Sections of a part in navigation order, including the publish pseudo-section for part 5
pub fn navigable_sections_for_part(part: Part) -> Vec<&'static SectionDescriptor> {
    let mut sections = sections_for_part(part);
    if part == PUBLISH.part {
        sections.push(&PUBLISH);
    }
    sections
}

/// Inclusive (start, end) bit range of a part
pub fn bit_range_for_part(part: Part) -> (u8, u8) {
    let descriptor = part_descriptor(part);
    (descriptor.start_bit, descriptor.end_bit)
}

fn part_descriptor(part: Part) -> PartDescriptor {
    let mut start_bit = u8::MAX;
    let mut end_bit = 0;
    for bit in SECTIONS.iter().filter(|s| s.part == part).filter_map(|s| s.bit_index()) {
        start_bit = start_bit.min(bit);
        end_bit = end_bit.max(bit);
    }
    PartDescriptor { part, start_bit, end_bit }
}

/// Look up any section, including the publish pseudo-section
pub fn section(id: &str) -> Option<&'static SectionDescriptor> {
    if id == PUBLISH.id {
        return Some(&PUBLISH);
    }
    SECTIONS.iter().find(|s| s.id == id)
}

/// Section bound to a given bit
pub fn section_for_bit(bit: u8) -> Option<&'static SectionDescriptor> {
    SECTIONS.get(bit as usize).filter(|s| s.bit_index() == Some(bit))
}

pub fn part_of(section_id: &str) -> Option<Part> {
    section(section_id).map(|s| s.part)
}

pub fn diagnostic_subsections() -> &'static [SubsectionDescriptor] {
    &DIAGNOSTIC_SUBSECTIONS
}

pub fn diagnostic_subsection(id: &str) -> Option<&'static SubsectionDescriptor> {
    DIAGNOSTIC_SUBSECTIONS.iter().find(|s| s.id == id)
}

pub fn impact_items() -> &'static [SubsectionDescriptor] {
    &IMPACT_ITEMS
}

pub fn impact_item(id: &str) -> Option<&'static SubsectionDescriptor> {
    IMPACT_ITEMS.iter().find(|s| s.id == id)
}

/// Sub-tab that renders a top-level part 2 section under the diagnostic tab
pub fn diagnostic_subsection_for(section: &SectionDescriptor) -> Option<&'static SubsectionDescriptor> {
    if section.part != Part::Priorities {
        return None;
    }
    DIAGNOSTIC_SUBSECTIONS.iter().find(|sub| sub.binding == section.binding)
}

/// Whether a top-level section is rendered under the diagnostic tab
pub fn is_diagnostic_section(section: &SectionDescriptor) -> bool {
    diagnostic_subsection_for(section).is_some()
}
