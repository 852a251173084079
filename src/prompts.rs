//! Instruction and context text sent to the completion service.
//!
//! The request has two parts: a fixed instruction (role, grounding rules,
//! response language) and a context block carrying the full document text
//! followed by the user's question. Callers can replace the instruction via
//! [`crate::config::QueryConfig::system_prompt`]; the context block layout is
//! fixed.

use crate::config::Language;

/// Default instruction when answers are requested in French.
pub const SYSTEM_PROMPT_FR: &str = "Vous êtes un assistant intelligent spécialisé dans l'analyse de documentation technique.
Votre tâche est de répondre aux questions de l'utilisateur en vous basant *uniquement* sur le contexte de la documentation fournie.
Trouvez toutes les sections, concepts et extraits de code pertinents qui répondent à la question de l'utilisateur.
Synthétisez ces informations en une réponse claire et complète.
Si la réponse ne se trouve pas dans le document, indiquez explicitement que l'information n'est pas présente.
N'utilisez aucune connaissance externe. La réponse doit être en français.";

/// Default instruction when answers are requested in English.
pub const SYSTEM_PROMPT_EN: &str = "You are an intelligent assistant specialised in analysing technical documentation.
Your task is to answer the user's questions based *only* on the context of the documentation provided.
Find every relevant section, concept and code excerpt that answers the user's question.
Synthesise this information into a clear and complete answer.
If the answer is not in the document, state explicitly that the information is not present.
Do not use any outside knowledge. The answer must be in English.";

/// The built-in instruction for `language`.
pub fn system_instruction(language: Language) -> &'static str {
    match language {
        Language::French => SYSTEM_PROMPT_FR,
        Language::English => SYSTEM_PROMPT_EN,
    }
}

/// Build the context block: document first, then the literal question.
pub fn build_context(document: &str, question: &str, language: Language) -> String {
    let (doc_intro, question_intro, closing) = match language {
        Language::French => (
            "Voici la documentation :",
            "Voici la question de l'utilisateur :",
            "Fournissez la réponse basée sur la documentation.",
        ),
        Language::English => (
            "Here is the documentation:",
            "Here is the user's question:",
            "Provide the answer based on the documentation.",
        ),
    };

    format!("{doc_intro}\n---\n{document}\n---\n\n{question_intro}\n---\n{question}\n---\n\n{closing}")
}
