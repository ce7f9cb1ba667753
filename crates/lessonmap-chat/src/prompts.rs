//! Prompt templates. `{context}` is replaced by the lesson chunk.

use lessonmap_core::Language;

const CONTEXT_PLACEHOLDER: &str = "{context}";

const ENGLISH_SYSTEM: &str = "You are an expert at creating detailed mind maps in JSON format. \
Build the map from the provided text only, never from the format example.";

const ARABIC_SYSTEM: &str = "أنت خبير في بناء الخرائط الذهنية التفصيلية بصيغة JSON. \
ابنِ الخريطة من النص المقدم فقط وليس من مثال الصيغة.";

const ENGLISH_MAIN: &str = r#"You are a cognitive science professor who builds detailed mind maps. Turn the text below into one mind map in JSON for the GoJS library.

Reply with JSON only: no prose, no markdown, no code fences. Start with { and end with }.

Format:
{
    "class": "go.TreeModel",
    "nodeDataArray": [
        {"key": 0, "text": "Main Topic", "loc": "0 0"},
        {"key": 1, "parent": 0, "text": "First Point"},
        {"key": 11, "parent": 1, "text": "Detail"},
        {"key": 2, "parent": 0, "text": "Second Point"}
    ]
}

Rules:
1. Main ideas of the text become children of the root.
2. Supporting details go under the idea they support.
3. Keep a clear hierarchy and do not drop important information.
4. Every key is a unique integer and every non-root node names its parent.
5. Summarize concepts; leave out anecdotes and worked examples.

Text:
{context}"#;

const ARABIC_MAIN: &str = r#"أنت أستاذ في علم الإدراك تبني خرائط ذهنية تفصيلية. حوّل النص أدناه إلى خريطة ذهنية واحدة بصيغة JSON لمكتبة GoJS.

أجب بـ JSON فقط: بلا شرح ولا Markdown ولا كتل كود. ابدأ بـ { وانتهِ بـ }.

الصيغة:
{
    "class": "go.TreeModel",
    "nodeDataArray": [
        {"key": 0, "text": "الموضوع الرئيسي", "loc": "0 0"},
        {"key": 1, "parent": 0, "text": "النقطة الأولى"},
        {"key": 11, "parent": 1, "text": "تفصيل"},
        {"key": 2, "parent": 0, "text": "النقطة الثانية"}
    ]
}

القواعد:
1. الأفكار الرئيسية في النص تصبح فروعًا مباشرة للجذر.
2. التفاصيل الداعمة توضع تحت الفكرة التي تدعمها.
3. حافظ على تسلسل هرمي واضح ولا تُسقط معلومة مهمة.
4. كل مفتاح عدد صحيح فريد وكل عقدة غير الجذر تحدد أباها.
5. لخّص المفاهيم واترك القصص والأمثلة المحلولة.
6. اكتب نصوص العقد باللغة العربية.

النص:
{context}"#;

const ENGLISH_PLANNING: &str = r#"Before any JSON, write a short planning outline (no JSON) for a mind map of the text below:
1) The root topic.
2) 5-8 main branches in a logical order.
3) 2-4 core sub-points under each main branch.

Text:
{context}"#;

const ARABIC_PLANNING: &str = r#"قبل أي JSON، اكتب مخططًا تمهيديًا قصيرًا (بلا JSON) لخريطة ذهنية للنص أدناه:
1) الموضوع الجذري.
2) من 5 إلى 8 فروع رئيسية بترتيب منطقي.
3) من 2 إلى 4 نقاط أساسية تحت كل فرع رئيسي.

النص:
{context}"#;

pub fn system_message(language: Language) -> &'static str {
    match language {
        Language::Arabic => ARABIC_SYSTEM,
        Language::English => ENGLISH_SYSTEM,
    }
}

pub fn main_template(language: Language) -> &'static str {
    match language {
        Language::Arabic => ARABIC_MAIN,
        Language::English => ENGLISH_MAIN,
    }
}

pub fn planning_template(language: Language) -> &'static str {
    match language {
        Language::Arabic => ARABIC_PLANNING,
        Language::English => ENGLISH_PLANNING,
    }
}

/// Substitute the lesson text into a template.
pub fn render(template: &str, context: &str) -> String {
    template.replacen(CONTEXT_PLACEHOLDER, context, 1)
}
