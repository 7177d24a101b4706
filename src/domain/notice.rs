use serde::{Deserialize, Serialize};
use std::fmt;

/// User-facing failure notices. There are no success notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notice {
    StockExceeded,
    AddFailed,
    RemoveFailed,
    UpdateFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::StockExceeded => "Quantidade solicitada fora de estoque",
            Notice::AddFailed => "Erro na adição do produto",
            Notice::RemoveFailed => "Erro na remoção do produto",
            Notice::UpdateFailed => "Erro na alteração de quantidade do produto",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
