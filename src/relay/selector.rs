//! Rule-based reply selection used when no remote completion is available.

use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use std::sync::LazyLock;

/// Number of characters of the lowercased input echoed into templated replies.
const ECHO_CHARS: usize = 30;

/// Whether a message arrived in a multi-participant chat or a private one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatContext {
    Group,
    Private,
}

impl ChatContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatContext::Group => "group",
            ChatContext::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    Question,
    Thanks,
    BotIdentity,
    HelpRequest,
    Default,
}

/// Ordered classification rules. First match wins, so order matters.
const RULES: &[(fn(&str) -> bool, Intent)] = &[
    (is_greeting, Intent::Greeting),
    (is_question, Intent::Question),
    (is_thanks, Intent::Thanks),
    (is_bot_identity, Intent::BotIdentity),
    (is_help_request, Intent::HelpRequest),
];

/// Build a matcher for keywords that must start at a word boundary, so
/// "hi" matches "hi" and "hiya" but not "this".
fn keywords(words: &[&str]) -> Regex {
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"\b(?:{alternation})")).expect("static keyword regex")
}

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    keywords(&["hello", "hi", "hey", "good morning", "good afternoon", "good evening"])
});
static THANKS: LazyLock<Regex> = LazyLock::new(|| keywords(&["thank", "thanks", "appreciate"]));
/// Also catches "bot" closing a compound word, as in "chatbot" or "my_bot".
static BOT_IDENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:bot|robot|ai)|bot\b").expect("static keyword regex")
});
static HELP_REQUEST: LazyLock<Regex> = LazyLock::new(|| keywords(&["help", "assist", "support"]));

fn is_greeting(text: &str) -> bool {
    GREETING.is_match(text)
}

fn is_question(text: &str) -> bool {
    text.contains('?')
}

fn is_thanks(text: &str) -> bool {
    THANKS.is_match(text)
}

fn is_bot_identity(text: &str) -> bool {
    BOT_IDENTITY.is_match(text)
}

fn is_help_request(text: &str) -> bool {
    HELP_REQUEST.is_match(text)
}

/// Classify a message. Matching is case-insensitive.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&lower))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Default)
}

/// A reply template: either fixed text or text wrapped around an echo of the input.
#[derive(Debug, Clone, Copy)]
enum Reply {
    Static(&'static str),
    Echo(&'static str, &'static str),
}

impl Reply {
    fn render(&self, lower: &str) -> String {
        match self {
            Reply::Static(text) => text.to_string(),
            Reply::Echo(before, after) => {
                let echo: String = lower.chars().take(ECHO_CHARS).collect();
                format!("{before}{echo}{after}")
            }
        }
    }
}

const GROUP_GREETING: &[Reply] = &[
    Reply::Static("Hey everyone! How's it going?"),
    Reply::Static("Hello there! Great to see some activity in the group!"),
    Reply::Static("Hi! Hope everyone's having a good day!"),
    Reply::Static("Greetings! What's the discussion about today?"),
    Reply::Static("Hey! Good to see you all here!"),
];

const GROUP_QUESTION: &[Reply] = &[
    Reply::Static("That's an interesting question! Anyone else have thoughts on this?"),
    Reply::Static("Good question! I'd love to hear what others think too."),
    Reply::Static("Hmm, that's worth discussing. What do you all think?"),
    Reply::Static("Interesting point! Does anyone have experience with this?"),
    Reply::Static("Great question for the group! Let's see what everyone thinks."),
];

const GROUP_THANKS: &[Reply] = &[
    Reply::Static("You're welcome! Happy to help the group!"),
    Reply::Static("No problem! That's what this community is for!"),
    Reply::Static("Glad I could contribute to the discussion!"),
    Reply::Static("Anytime! Love seeing helpful conversations here!"),
    Reply::Static("You're very welcome! Keep the great discussions going!"),
];

const GROUP_BOT_IDENTITY: &[Reply] = &[
    Reply::Static("Yes, I'm your friendly group bot! Here to help keep conversations interesting!"),
    Reply::Static("That's me! I'm here to assist and engage with the group!"),
    Reply::Static("Correct! I'm an AI bot designed to make group chats more interactive!"),
    Reply::Static("Indeed! I'm here to contribute to your group discussions!"),
    Reply::Static("Yep! Your resident bot, ready to chat and help out!"),
];

const GROUP_HELP: &[Reply] = &[
    Reply::Static("I'm here to help! What can I assist the group with?"),
    Reply::Static("Happy to help out! What do you need assistance with?"),
    Reply::Static("Sure thing! How can I support the group today?"),
    Reply::Static("Of course! I'm here to make things easier for everyone!"),
    Reply::Static("Absolutely! What kind of help are you looking for?"),
];

const GROUP_DEFAULT: &[Reply] = &[
    Reply::Echo("Interesting point about '", "...' - what does everyone else think?"),
    Reply::Static("That's a cool topic! Anyone else want to share their thoughts?"),
    Reply::Static("Thanks for sharing! I find group discussions really engaging."),
    Reply::Static("Good point! This group always has such thoughtful conversations."),
    Reply::Static("I appreciate you bringing this up - it's great to see active discussions!"),
    Reply::Static("That's worth discussing further! What are your experiences with this?"),
    Reply::Static("Interesting perspective! I'd love to hear more viewpoints from the group."),
];

const PRIVATE_GREETING: &[Reply] = &[
    Reply::Static("Hello! Nice to chat with you personally. How can I help?"),
    Reply::Static("Hi there! Great to have a one-on-one conversation. What's on your mind?"),
    Reply::Static("Hey! I'm all ears. What would you like to talk about?"),
    Reply::Static("Good to see you! How has your day been going?"),
    Reply::Static("Hello! I'm here and ready to chat. What's new with you?"),
];

const PRIVATE_QUESTION: &[Reply] = &[
    Reply::Echo("That's a thoughtful question about '", "...' Let me think about that!"),
    Reply::Static("You've got me curious now! That's definitely something worth exploring."),
    Reply::Static("Great question! I find these kinds of topics really engaging."),
    Reply::Static("That's an interesting way to look at it. What made you think of that?"),
    Reply::Static("I love questions like this! They really make you think, don't they?"),
];

const PRIVATE_THANKS: &[Reply] = &[
    Reply::Static("You're absolutely welcome! I really enjoy our conversations."),
    Reply::Static("My pleasure! I'm always happy to chat with you."),
    Reply::Static("Don't mention it! These discussions are great."),
    Reply::Static("Anytime! I appreciate you taking the time to chat."),
    Reply::Static("You're very welcome! Feel free to reach out whenever you want to talk."),
];

const PRIVATE_BOT_IDENTITY: &[Reply] = &[
    Reply::Static("Yes, I'm an AI bot, but I try to make our conversations feel natural and engaging!"),
    Reply::Static("That's right! I'm here to be your personal chat companion whenever you need one."),
    Reply::Static("Indeed I am! But I like to think of myself as a friendly conversation partner."),
    Reply::Static("Correct! I'm designed to have meaningful conversations just like this one."),
    Reply::Static("Yes, but don't let that stop us from having great chats together!"),
];

const PRIVATE_HELP: &[Reply] = &[
    Reply::Static("I'd be delighted to help! What's on your mind?"),
    Reply::Static("Absolutely! I'm here to assist however I can. What do you need?"),
    Reply::Static("Of course! I love being helpful. How can I support you today?"),
    Reply::Static("I'm all yours! What kind of assistance are you looking for?"),
    Reply::Static("Happy to help! Just let me know what you'd like to discuss or work on."),
];

const PRIVATE_DEFAULT: &[Reply] = &[
    Reply::Echo("That's really interesting what you said about '", "...' Tell me more!"),
    Reply::Static("I find that fascinating! What's your experience been with that?"),
    Reply::Static("You've got me thinking now. That's a really good point you make."),
    Reply::Static("I appreciate you sharing that with me. What led you to that conclusion?"),
    Reply::Static("That's a unique perspective! I'd love to hear more of your thoughts on it."),
    Reply::Static("Thanks for bringing that up - it's given me something new to consider!"),
    Reply::Static("I really enjoy these kinds of conversations with you. What else is on your mind?"),
];

fn candidates(intent: Intent, context: ChatContext) -> &'static [Reply] {
    match (context, intent) {
        (ChatContext::Group, Intent::Greeting) => GROUP_GREETING,
        (ChatContext::Group, Intent::Question) => GROUP_QUESTION,
        (ChatContext::Group, Intent::Thanks) => GROUP_THANKS,
        (ChatContext::Group, Intent::BotIdentity) => GROUP_BOT_IDENTITY,
        (ChatContext::Group, Intent::HelpRequest) => GROUP_HELP,
        (ChatContext::Group, Intent::Default) => GROUP_DEFAULT,
        (ChatContext::Private, Intent::Greeting) => PRIVATE_GREETING,
        (ChatContext::Private, Intent::Question) => PRIVATE_QUESTION,
        (ChatContext::Private, Intent::Thanks) => PRIVATE_THANKS,
        (ChatContext::Private, Intent::BotIdentity) => PRIVATE_BOT_IDENTITY,
        (ChatContext::Private, Intent::HelpRequest) => PRIVATE_HELP,
        (ChatContext::Private, Intent::Default) => PRIVATE_DEFAULT,
    }
}

/// Every reply the selector could produce for this input and context.
pub fn possible_replies(text: &str, context: ChatContext) -> Vec<String> {
    let lower = text.to_lowercase();
    candidates(classify(text), context)
        .iter()
        .map(|r| r.render(&lower))
        .collect()
}

/// Pick a canned reply for the message. Always returns non-empty text.
pub fn select_fallback(text: &str, context: ChatContext) -> String {
    select_fallback_with(&mut rand::rng(), text, context)
}

/// Same as [`select_fallback`] but with a caller-supplied RNG.
pub fn select_fallback_with<R: Rng + ?Sized>(rng: &mut R, text: &str, context: ChatContext) -> String {
    let lower = text.to_lowercase();
    let set = candidates(classify(text), context);
    // Every table is a non-empty const slice.
    match set.choose(rng) {
        Some(reply) => reply.render(&lower),
        None => GROUP_DEFAULT[1].render(&lower),
    }
}
