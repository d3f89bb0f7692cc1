//! Descritor concreto de uma requisição de compilação de kernel.

use serde::{Deserialize, Serialize};

/// Formato de layout de um tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Format {
    #[default]
    Nd,
    Nchw,
    Nhwc,
    Ncdhw,
    Ndhwc,
    Nc1hwc0,
    FractalZ,
    FractalNz,
}

impl Format {
    /// Código estável usado no hash.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Tipo de dado dos elementos de um tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    Float,
    Float16,
    Bfloat16,
    Double,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
}

impl DataType {
    /// Código estável usado no hash.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Atributo serializado do operador, comparado byte a byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrBlob(Vec<u8>);

impl AttrBlob {
    /// Cria um blob a partir de bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Bytes do atributo.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for AttrBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for AttrBlob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Informações de um tensor de entrada ou saída.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorInfo {
    /// Shape de execução.
    #[serde(default)]
    pub shape: Vec<i64>,

    /// Shape original (antes de transformações de formato).
    #[serde(default)]
    pub origin_shape: Vec<i64>,

    /// Faixas (min, max) por dimensão, para shapes dinâmicos.
    #[serde(default)]
    pub shape_range: Vec<(i64, i64)>,

    /// Formato de execução.
    #[serde(default)]
    pub format: Format,

    /// Formato original.
    #[serde(default)]
    pub origin_format: Format,

    /// Tipo de dado.
    #[serde(default)]
    pub data_type: DataType,
}

impl TensorInfo {
    /// Cria informações de tensor sem shape.
    pub fn new(format: Format, origin_format: Format, data_type: DataType) -> Self {
        Self {
            format,
            origin_format,
            data_type,
            ..Self::default()
        }
    }

    /// Define o shape de execução e, se vazio, também o original.
    pub fn with_shape(mut self, shape: impl Into<Vec<i64>>) -> Self {
        self.shape = shape.into();
        if self.origin_shape.is_empty() {
            self.origin_shape = self.shape.clone();
        }
        self
    }

    /// Define o shape original.
    pub fn with_origin_shape(mut self, origin_shape: impl Into<Vec<i64>>) -> Self {
        self.origin_shape = origin_shape.into();
        self
    }

    /// Define as faixas de shape.
    pub fn with_shape_range(mut self, shape_range: impl Into<Vec<(i64, i64)>>) -> Self {
        self.shape_range = shape_range.into();
        self
    }
}

/// Descrição estrutural de uma requisição de compilação.
///
/// Duas requisições são a mesma compilação se e somente se
/// [`CompileCacheDesc::is_same_compile_desc`] retorna `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCacheDesc {
    /// Tipo do operador (ex.: "MatMul").
    pub op_type: String,

    /// Identificador do nó/operador no grafo.
    #[serde(default)]
    pub unique_id: i64,

    /// Atributos serializados que não são shape.
    #[serde(default)]
    pub attrs: Vec<AttrBlob>,

    /// Tensores de entrada e saída, em ordem.
    #[serde(default)]
    pub tensors: Vec<TensorInfo>,
}

impl CompileCacheDesc {
    /// Cria um descritor para o tipo de operador informado.
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            ..Self::default()
        }
    }

    /// Define o id único.
    pub fn with_unique_id(mut self, unique_id: i64) -> Self {
        self.unique_id = unique_id;
        self
    }

    /// Adiciona um atributo.
    pub fn with_attr(mut self, attr: impl Into<AttrBlob>) -> Self {
        self.attrs.push(attr.into());
        self
    }

    /// Adiciona um tensor.
    pub fn with_tensor(mut self, tensor: TensorInfo) -> Self {
        self.tensors.push(tensor);
        self
    }

    /// Igualdade estrutural completa entre dois descritores.
    ///
    /// Compara tipo, id, todos os atributos byte a byte e todos os campos
    /// de cada tensor, inclusive shapes e faixas.
    pub fn is_same_compile_desc(first: &CompileCacheDesc, second: &CompileCacheDesc) -> bool {
        first == second
    }
}
