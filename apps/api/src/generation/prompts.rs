// All LLM prompt constants for the Generation module.
// Templates use `{placeholder}` substitution via `str::replace`.

/// System instruction for narrative synthesis.
pub const NARRATIVE_SYSTEM: &str = "\
You are a critically-acclaimed author known for your witty, surreal, and poignant short stories, \
often published in prestigious literary journals. Your task is to write a short story that \
masterfully and cohesively intertwines the disparate topics you are given. Weave their core ideas \
into a singular, compelling narrative with a distinct voice and style. The story should be both \
absurd and profound, finding unexpected connections. It must have a creative, literary title. \
You will also create a concise, visually descriptive prompt suitable for an AI image generator \
to create cover art.";

/// Narrative prompt. Replace `{topic_count}` and `{topics}` before sending.
pub const NARRATIVE_PROMPT_TEMPLATE: &str = "\
Here are the {topic_count} topics to integrate:\n\
{topics}\n\
\n\
Now, based on these topics, provide a creative title, the full story text, and a safe-for-work \
image generation prompt.";

pub const TITLE_DESCRIPTION: &str = "A creative and literary title for the story.";

pub const STORY_DESCRIPTION: &str =
    "The full text of the generated short story, with paragraphs separated by newline characters.";

pub const IMAGE_PROMPT_DESCRIPTION: &str = "\
A short, descriptive, and visually-rich prompt (max 75 words) for an AI image generator to \
create cover art. This prompt must be safe for work and focus on concrete visual elements. \
CRUCIALLY, it must avoid describing elements that typically contain text, such as books, signs, \
screens, or packaging. The goal is a purely visual, text-free image.";

/// Appended to every illustration prompt: art direction.
pub const ILLUSTRATION_STYLE: &str = "\
A clean, wordless, text-free image. Illustrative cover art, surreal digital painting, cinematic \
lighting, thought-provoking, enigmatic, detailed composition, fantasy meets realism.";

/// Appended after the style: the backend must not draw any lettering.
pub const ILLUSTRATION_EXCLUSION: &str =
    "Absolutely no text, no letters, no typography, no signatures, no watermarks.";
