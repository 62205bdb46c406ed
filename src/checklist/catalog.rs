use std::fmt;

use serde::{Deserialize, Serialize};

/// Identificadores fixos dos itens do checklist da linha de molas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKey {
    Etiqueta,
    PlacaInmetro,
    CorDaViga,
    Grampo,
    FeixeDeMola,
    EntreCentro,
    BracoFixo,
    BracoMovel,
    ParafusoDosBracos,
    Raqueamento,
    Solda,
}

impl ItemKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKey::Etiqueta => "ETIQUETA",
            ItemKey::PlacaInmetro => "PLACA_INMETRO",
            ItemKey::CorDaViga => "COR_DA_VIGA",
            ItemKey::Grampo => "GRAMPO",
            ItemKey::FeixeDeMola => "FEIXE_DE_MOLA",
            ItemKey::EntreCentro => "ENTRE_CENTRO",
            ItemKey::BracoFixo => "BRACO_FIXO",
            ItemKey::BracoMovel => "BRACO_MOVEL",
            ItemKey::ParafusoDosBracos => "PARAFUSO_DOS_BRACOS",
            ItemKey::Raqueamento => "RAQUEAMENTO",
            ItemKey::Solda => "SOLDA",
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uma pergunta do checklist, com índice começando em 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub index: usize,
    pub key: ItemKey,
    pub text: &'static str,
}

/// Lista ordenada de perguntas apresentada ao inspetor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Monta um catálogo numerando `items` a partir de 1.
    pub fn from_items(items: &[(ItemKey, &'static str)]) -> Self {
        let questions = items
            .iter()
            .enumerate()
            .map(|(i, (key, text))| Question {
                index: i + 1,
                key: *key,
                text,
            })
            .collect();
        Self { questions }
    }

    /// Checklist de qualidade da linha de molas.
    pub fn mola() -> Self {
        Self::from_items(&[
            (
                ItemKey::Etiqueta,
                "Etiqueta do produto – As informações estão corretas / legíveis conforme modelo e gravação do eixo?",
            ),
            (
                ItemKey::PlacaInmetro,
                "Placa do Inmetro está correta / fixada e legível? Número corresponde à viga?",
            ),
            (
                ItemKey::CorDaViga,
                "A cor (Letra) do número de série é compatível com a etiqueta? Informe cor:",
            ),
            (
                ItemKey::Grampo,
                "Os grampos estão conforme a estrutura? Informe dimensão:",
            ),
            (ItemKey::FeixeDeMola, "Qual o feixe de mola utilizado?"),
            (
                ItemKey::EntreCentro,
                "A medida do entre centro dos feixes está correta?",
            ),
            (ItemKey::BracoFixo, "Qual o comprimento do braço fixo utilizado?"),
            (ItemKey::BracoMovel, "Qual o comprimento do braço móvel utilizado?"),
            (
                ItemKey::ParafusoDosBracos,
                "Os parafusos dos braços estão apertados?",
            ),
            (
                ItemKey::Raqueamento,
                "Porcas das bases laterais do Rack estão corretamente apertadas?",
            ),
            (
                ItemKey::Solda,
                "Tampa do cubo, pintura e graxeiras estão conforme?",
            ),
        ])
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.iter().find(|q| q.index == index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self::mola()
    }
}
