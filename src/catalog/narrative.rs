//! Narrative text for generated objects.
//!
//! Each category draws whole sentences from its own pool, so tone follows
//! category: incriminating text is specific and damning, decoy text is
//! suggestive but vague, ambient text is mundane.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::objects::AppearanceTag;

const INCRIMINATING_OPENERS: &[&str] = &[
    "The {d} has been wiped down, but not well enough.",
    "Someone tried hard to hide this {d}.",
    "The {d} sits where it was dropped in a hurry.",
    "This {d} does not belong in the {t}.",
];

const INCRIMINATING_DETAILS: &[&str] = &[
    "A dark smear along one edge has dried to a rust color.",
    "A partial print is pressed into the grime.",
    "Fibers caught on it match the victim's coat.",
    "It carries the faint smell of bleach and copper.",
    "Scratches on it line up with the wounds described in the report.",
    "A monogram has been scraped off, leaving bright metal behind.",
    "The soil clinging to it is not from around here.",
];

const INCRIMINATING_CLOSERS: &[&str] = &[
    "Whoever left it here was close to the victim that night.",
    "This is the kind of mistake that hangs a man.",
    "It places the killer here within the last day.",
    "The timeline in the file just fell apart.",
];

const DECOY_SENTENCES: &[&str] = &[
    "The {d} looks out of place, or maybe it doesn't.",
    "There might be a stain on it, hard to tell in this light.",
    "Plenty of people pass through the {t} every day.",
    "It could mean something.",
    "It could just as easily mean nothing at all.",
    "Something about it nags at you.",
    "It is worn in the way everyday things get worn.",
    "You have seen a dozen like it this week.",
];

const AMBIENT_SENTENCES: &[&str] = &[
    "Just the {d}, nothing more.",
    "It has been here a while.",
    "Nobody has touched it in days.",
    "It is exactly what it looks like.",
    "The {t} is full of things like this.",
    "It tells you nothing about the case.",
    "Weather has dulled whatever color it once had.",
];

const CONTAINER_SENTENCES: &[&str] = &[
    "A {d} that could hold almost anything.",
    "The lid is closed but not locked.",
    "Searching it will take a few moments.",
    "Something shifts inside when you nudge it.",
    "It has seen heavy use.",
];

/// Descriptor pools for evidence-style objects, per appearance
pub fn evidence_descriptors(tag: AppearanceTag) -> &'static [&'static str] {
    match tag {
        AppearanceTag::Weapon => &[
            "kitchen knife",
            "tire iron",
            "snub-nosed revolver",
            "length of lead pipe",
            "straight razor",
        ],
        AppearanceTag::Garment => &[
            "bloodied glove",
            "torn trench coat",
            "silk necktie",
            "muddy wingtip shoe",
            "monogrammed handkerchief",
        ],
        AppearanceTag::Tool => &[
            "claw hammer",
            "hacksaw",
            "coil of piano wire",
            "pry bar",
            "box cutter",
        ],
        AppearanceTag::Organic => &[
            "lock of dark hair",
            "trampled carnation",
            "lipstick-marked cigarette butt",
            "chewed toothpick",
        ],
        AppearanceTag::Container => &["sealed parcel"],
    }
}

fn fill(template: &str, descriptor: &str, theme: &str) -> String {
    template.replace("{d}", descriptor).replace("{t}", theme)
}

fn pick<R: Rng + ?Sized>(pool: &[&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or("")
}

/// Specific, damning text: opener, 1-3 details, closer (3-5 sentences)
pub fn incriminating<R: Rng + ?Sized>(descriptor: &str, theme: &str, rng: &mut R) -> String {
    let detail_count = rng.gen_range(1..=3);
    let mut sentences = vec![fill(pick(INCRIMINATING_OPENERS, rng), descriptor, theme)];
    sentences.extend(
        INCRIMINATING_DETAILS
            .choose_multiple(rng, detail_count)
            .map(|s| s.to_string()),
    );
    sentences.push(fill(pick(INCRIMINATING_CLOSERS, rng), descriptor, theme));
    sentences.join(" ")
}

/// Vague text: the first sentence always names the object
pub fn decoy<R: Rng + ?Sized>(descriptor: &str, theme: &str, rng: &mut R) -> String {
    let mut sentences = vec![fill(DECOY_SENTENCES[0], descriptor, theme)];
    sentences.extend(
        DECOY_SENTENCES[1..]
            .choose_multiple(rng, 2)
            .map(|s| fill(s, descriptor, theme)),
    );
    sentences.join(" ")
}

pub fn ambient<R: Rng + ?Sized>(descriptor: &str, theme: &str, rng: &mut R) -> String {
    let mut sentences = vec![fill(AMBIENT_SENTENCES[0], descriptor, theme)];
    sentences.extend(
        AMBIENT_SENTENCES[1..]
            .choose_multiple(rng, 2)
            .map(|s| fill(s, descriptor, theme)),
    );
    sentences.join(" ")
}

pub fn container<R: Rng + ?Sized>(descriptor: &str, theme: &str, rng: &mut R) -> String {
    let mut sentences = vec![fill(CONTAINER_SENTENCES[0], descriptor, theme)];
    sentences.extend(
        CONTAINER_SENTENCES[1..]
            .choose_multiple(rng, 2)
            .map(|s| fill(s, descriptor, theme)),
    );
    sentences.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{RngStream, SessionSeed};

    fn sentences(text: &str) -> usize {
        text.chars().filter(|c| *c == '.').count()
    }

    #[test]
    fn test_incriminating_sentence_range() {
        let mut rng = SessionSeed::new(3).rng(RngStream::Catalog);
        for _ in 0..200 {
            let text = incriminating("tire iron", "docks", &mut rng);
            let n = sentences(&text);
            assert!((3..=5).contains(&n), "got {} sentences: {}", n, text);
            assert!(text.contains("tire iron"));
        }
    }

    #[test]
    fn test_other_categories_have_three_sentences() {
        let mut rng = SessionSeed::new(9).rng(RngStream::Catalog);
        for _ in 0..50 {
            assert_eq!(sentences(&decoy("silk necktie", "park", &mut rng)), 3);
            assert_eq!(sentences(&ambient("pine cones", "park", &mut rng)), 3);
            assert_eq!(sentences(&container("picnic cooler", "park", &mut rng)), 3);
        }
    }

    #[test]
    fn test_ambient_opener_reads_for_plurals() {
        let mut rng = SessionSeed::new(5).rng(RngStream::Catalog);
        let text = ambient("pine cones", "park", &mut rng);
        assert!(text.starts_with("Just the pine cones, nothing more."), "{}", text);
        assert!(!text.contains("A pine cones"));
    }

    #[test]
    fn test_no_unfilled_placeholders() {
        let mut rng = SessionSeed::new(11).rng(RngStream::Catalog);
        for _ in 0..100 {
            let text = decoy("hacksaw", "alley", &mut rng) + &incriminating("hacksaw", "alley", &mut rng);
            assert!(!text.contains("{d}") && !text.contains("{t}"));
        }
    }

    #[test]
    fn test_every_tag_has_descriptors() {
        for tag in AppearanceTag::all() {
            assert!(!evidence_descriptors(*tag).is_empty());
        }
    }
}
