//! Prompt construction for generation categories.
//!
//! System prompts are fixed per category and written in Brazilian Portuguese,
//! the language of the product's users. Text categories must answer with a
//! JSON object; the expected keys are spelled out in each system prompt.

use codia_core::GenerationCategory;

/// Inputs shared by every generation.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// Business name, always present.
    pub business_name: &'a str,
    /// Free-text details (product, audience, goal).
    pub details: Option<&'a str>,
    /// Caller-supplied context object.
    pub context: Option<&'a serde_json::Value>,
    /// Stored brand voice artifact, when the category uses it.
    pub brand_voice: Option<&'a serde_json::Value>,
}

/// Fixed system prompt for a text category.
#[must_use]
pub const fn system_prompt(category: GenerationCategory) -> &'static str {
    match category {
        GenerationCategory::Copywriter => {
            "Você é um copywriter sênior especializado em pequenos negócios brasileiros. \
             Escreva textos persuasivos, claros e honestos. Responda apenas com um objeto JSON \
             com as chaves \"headline\", \"subheadline\", \"body\" e \"callToAction\"."
        }
        GenerationCategory::BrandVoice => {
            "Você é um estrategista de marca. Defina a voz da marca a partir do nome e do \
             contexto do negócio. Responda apenas com um objeto JSON com as chaves \"tone\", \
             \"personality\" (lista), \"vocabulary\" (lista), \"avoid\" (lista) e \"tagline\"."
        }
        GenerationCategory::Storefront => {
            "Você é um especialista em e-commerce. Monte a estrutura de uma loja virtual \
             completa. Responda apenas com um objeto JSON com as chaves \"heroTitle\", \
             \"heroSubtitle\", \"sections\" (lista de objetos com \"title\" e \"content\"), \
             \"about\" e \"faq\" (lista de objetos com \"question\" e \"answer\")."
        }
        GenerationCategory::MarketingCampaign => {
            "Você é um gerente de marketing digital. Planeje uma campanha multicanal \
             (Instagram, WhatsApp e e-mail). Responda apenas com um objeto JSON com as chaves \
             \"name\", \"objective\", \"audience\", \"posts\" (lista de objetos com \"channel\" \
             e \"text\") e \"schedule\"."
        }
        GenerationCategory::ProductDescription => {
            "Você é um redator de catálogo. Escreva uma descrição curta e vendedora para o \
             produto. Responda apenas com um objeto JSON com as chaves \"title\", \
             \"description\" e \"highlights\" (lista)."
        }
        GenerationCategory::Logo | GenerationCategory::ProductImage => {
            "Você descreve imagens para um gerador de imagens."
        }
    }
}

/// User message for a text category.
#[must_use]
pub fn user_prompt(category: GenerationCategory, input: &PromptInput<'_>) -> String {
    let mut prompt = format!(
        "Negócio: {}\nTarefa: {}",
        input.business_name,
        task_label(category)
    );

    if let Some(details) = input.details {
        prompt.push_str("\nDetalhes: ");
        prompt.push_str(details);
    }
    if let Some(voice) = input.brand_voice {
        prompt.push_str("\nVoz da marca (siga à risca): ");
        prompt.push_str(&voice.to_string());
    }
    if let Some(context) = input.context {
        prompt.push_str("\nContexto adicional: ");
        prompt.push_str(&context.to_string());
    }

    prompt
}

/// Prompt for an image category.
#[must_use]
pub fn image_prompt(category: GenerationCategory, input: &PromptInput<'_>) -> String {
    let details = input.details.unwrap_or_default();
    match category {
        GenerationCategory::ProductImage => format!(
            "Fotografia de produto profissional para a loja \"{}\": {details}. \
             Fundo limpo, iluminação de estúdio, alta resolução.",
            input.business_name
        ),
        _ => {
            let mut prompt = format!(
                "Logotipo minimalista e moderno para a marca \"{}\". Vetorial, fundo branco, \
                 sem texto adicional além do nome.",
                input.business_name
            );
            if !details.is_empty() {
                prompt.push_str(" Referências: ");
                prompt.push_str(details);
            }
            prompt
        }
    }
}

const fn task_label(category: GenerationCategory) -> &'static str {
    match category {
        GenerationCategory::Logo => "logotipo",
        GenerationCategory::Copywriter => "texto de vendas",
        GenerationCategory::BrandVoice => "voz da marca",
        GenerationCategory::Storefront => "loja virtual",
        GenerationCategory::MarketingCampaign => "campanha de marketing",
        GenerationCategory::ProductDescription => "descrição de produto",
        GenerationCategory::ProductImage => "foto de produto",
    }
}
