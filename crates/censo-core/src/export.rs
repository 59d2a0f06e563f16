//! Flattening a completed census into one spreadsheet row.
//!
//! The layout is fixed: thirteen school identity columns followed by the
//! survey answers in form order. Answers are looked up by key in the merged
//! payload; a missing key yields an empty cell.

use serde_json::Value;

use crate::{
  census::{Answers, CensusRecord},
  school::School,
};

/// One spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
  DirectorName,
  DirectorRegistration,
  DirectorContact,
  Region,
  SchoolName,
  InepCode,
  Cnpj,
  Address,
  Phone,
  Municipality,
  PostalCode,
  Zone,
  Shifts,
  /// A survey answer, looked up by key.
  Answer(&'static str),
  /// `"1. {prioridade_1} | 2. {prioridade_2} | 3. {prioridade_3}"`.
  Priorities,
}

use Column::*;

/// Every exported column, in sheet order.
pub const COLUMNS: &[Column] = &[
  DirectorName,
  DirectorRegistration,
  DirectorContact,
  Region,
  SchoolName,
  InepCode,
  Cnpj,
  Address,
  Phone,
  Municipality,
  PostalCode,
  Zone,
  Shifts,
  // General data and infrastructure
  Answer("tipo_predio"),
  Answer("possui_anexos"),
  Answer("qtd_anexos"),
  Answer("tipo_predio_anexo"),
  Answer("etapas_ofertadas"),
  Answer("modalidades_ofertadas"),
  Answer("qtd_salas_aula"),
  Answer("turmas_manha"),
  Answer("turmas_tarde"),
  Answer("turmas_noite"),
  Answer("total_alunos"),
  Answer("alunos_pcd"),
  Answer("alunos_rural"),
  Answer("alunos_urbana"),
  Answer("muro_cerca"),
  Answer("perimetro_fechado"),
  Answer("situacao_estrutura"),
  Answer("data_ultima_reforma"),
  Answer("ambientes"),
  Answer("quadra_coberta"),
  Answer("qtd_quadras"),
  Answer("banda_fanfarra"),
  Answer("banheiros_alunos"),
  Answer("banheiros_prof"),
  Answer("banheiros_chuveiro"),
  Answer("banheiros_vasos_funcionais"),
  Answer("salas_climatizadas"),
  Answer("energia"),
  Answer("transformador"),
  Answer("rede_eletrica_atende"),
  Answer("problemas_eletricos"),
  Answer("estrutura_climatizacao"),
  Answer("suporta_novos_equipamentos"),
  Answer("cameras_funcionamento"),
  Answer("cameras_cobrem"),
  // Food service
  Answer("condicoes_cozinha"),
  Answer("tamanho_cozinha"),
  Answer("oferta_regular"),
  Answer("qualidade_merenda"),
  Answer("atende_necessidades"),
  Answer("possui_refeitorio"),
  Answer("refeitorio_adequado"),
  Answer("possui_balanca"),
  Answer("qtd_freezers"),
  Answer("estado_freezers"),
  Answer("qtd_geladeiras"),
  Answer("estado_geladeiras"),
  Answer("qtd_fogoes"),
  Answer("estado_fogoes"),
  Answer("qtd_fornos"),
  Answer("estado_fornos"),
  Answer("qtd_bebedouros"),
  Answer("estado_bebedouros"),
  Answer("bancadas_inox"),
  Answer("sistema_exaustao"),
  Answer("despensa_exclusiva"),
  Answer("deposito_conserva"),
  Answer("estoque_epi_extintor"),
  Answer("manutencao_extintores"),
  Answer("qtd_merendeiras_estatutaria"),
  Answer("qtd_merendeiras_terceirizada"),
  Answer("qtd_merendeiras_temporaria"),
  Answer("qtd_atende_necessidade_merenda"),
  Answer("empresa_terceirizada_merenda"),
  Answer("possui_supervisor_merenda"),
  Answer("nome_supervisor_merenda"),
  Answer("contato_supervisor_merenda"),
  // Cleaning staff
  Answer("qtd_servicos_gerais_efetivo"),
  Answer("qtd_servicos_gerais_temporario"),
  Answer("qtd_servicos_gerais_terceirizado"),
  Answer("qtd_atende_necessidade_sg"),
  Answer("quantitativo_necessario_sg"),
  Answer("empresa_terceirizada_sg"),
  Answer("possui_supervisor_sg"),
  Answer("nome_supervisor_sg"),
  Answer("contato_supervisor_sg"),
  // Gatehouse
  Answer("possui_guarita"),
  Answer("controle_portao"),
  Answer("iluminacao_externa"),
  Answer("possui_botao_panico"),
  Answer("qtd_agentes_portaria"),
  Answer("qtd_atende_necessidade_portaria"),
  Answer("quantitativo_necessario_portaria"),
  Answer("empresa_terceirizada_portaria"),
  Answer("possui_supervisor_portaria"),
  Answer("nome_supervisor_portaria"),
  Answer("contato_supervisor_portaria"),
  // Technology
  Answer("internet_disponivel"),
  Answer("provedor_internet"),
  Answer("qualidade_internet"),
  Answer("qtd_desktop_adm"),
  Answer("qtd_desktop_alunos"),
  Answer("qtd_notebooks"),
  Answer("qtd_chromebooks"),
  Answer("computadores_atendem"),
  Answer("qtd_computadores_inoperantes"),
  Answer("possui_projetor"),
  Answer("qtd_projetores"),
  Answer("possui_lousa_digital"),
  // Staff
  Answer("possui_direcao"),
  Answer("possui_vice_pedagogico"),
  Answer("possui_vice_administrativo"),
  Answer("possui_secretario"),
  Answer("possui_coord_pedagogico"),
  Answer("qtd_coord_pedagogico"),
  Answer("possui_coord_area_matematica"),
  Answer("possui_coord_area_linguagem"),
  Answer("possui_coord_area_humanas"),
  Answer("possui_coord_area_natureza"),
  Answer("qtd_professores_efetivos"),
  Answer("qtd_professores_temporarios"),
  Answer("qtd_servidores_administrativos"),
  Answer("possui_professor_readaptado"),
  Answer("qtd_professor_readaptado"),
  // Students
  Answer("total_beneficiarios"),
  Answer("taxa_abandono"),
  Answer("taxa_reprovacao_fund1"),
  Answer("taxa_reprovacao_fund2"),
  Answer("taxa_reprovacao_medio"),
  Answer("ideb_anos_iniciais"),
  Answer("ideb_anos_finais"),
  Answer("ideb_ensino_medio"),
  // Management
  Answer("regularizada_cee"),
  Answer("conselho_escolar"),
  Answer("conselho_ativo"),
  Answer("recursos_prodep"),
  Answer("valor_prodep"),
  Answer("execucao_prodep"),
  Answer("pendencias_prodep"),
  Answer("recursos_federais"),
  Answer("valor_federais"),
  Answer("execucao_federais"),
  Answer("pendencias_federais"),
  Answer("gremio_estudantil"),
  Answer("reunioes_comunidade"),
  Answer("plano_evacuacao"),
  Answer("politica_bullying"),
  // Ratings
  Answer("avaliacao_merendeiras"),
  Answer("avaliacao_portaria"),
  Answer("avaliacao_limpeza"),
  Answer("avaliacao_comunicacao"),
  Answer("avaliacao_supervisao"),
  // Observations
  Priorities,
  Answer("demanda_urgente"),
  Answer("descricao_urgencia"),
  Answer("sugestao_melhoria"),
  Answer("descricao_sugestao"),
  Answer("nome_responsavel"),
  Answer("cargo_funcao"),
  Answer("matricula_funcional"),
  Answer("declaracao_verdadeira"),
];

impl Column {
  /// Header label for the column.
  pub fn label(&self) -> &'static str {
    match self {
      DirectorName => "nome_diretor",
      DirectorRegistration => "matricula_diretor",
      DirectorContact => "contato_diretor",
      Region => "dre",
      SchoolName => "nome_escola",
      InepCode => "codigo_inep",
      Cnpj => "cnpj",
      Address => "endereco",
      Phone => "telefone_institucional",
      Municipality => "municipio",
      PostalCode => "cep",
      Zone => "zona",
      Shifts => "turnos",
      Answer(key) => *key,
      Priorities => "prioridades",
    }
  }

  fn render(&self, school: &School, data: &Answers) -> String {
    let p = &school.profile;
    match self {
      DirectorName => p.director_name.clone(),
      DirectorRegistration => p.director_registration.clone(),
      DirectorContact => p.director_contact.clone(),
      Region => p.region.clone(),
      SchoolName => p.name.clone(),
      InepCode => p.inep_code.clone(),
      Cnpj => p.cnpj.clone(),
      Address => p.address.clone(),
      Phone => p.phone.clone(),
      Municipality => p.municipality.clone(),
      PostalCode => p.postal_code.clone(),
      Zone => p.zone.clone(),
      Shifts => render_value(&p.shifts),
      Answer(key) => lookup(data, key),
      Priorities => format!(
        "1. {} | 2. {} | 3. {}",
        lookup(data, "prioridade_1"),
        lookup(data, "prioridade_2"),
        lookup(data, "prioridade_3"),
      ),
    }
  }
}

/// Header row matching [`census_row`].
pub fn header_row() -> Vec<&'static str> { COLUMNS.iter().map(Column::label).collect() }

/// Flatten `census` and `school` into one row, in [`COLUMNS`] order.
pub fn census_row(school: &School, census: &CensusRecord) -> Vec<String> {
  COLUMNS
    .iter()
    .map(|column| column.render(school, &census.data))
    .collect()
}

fn lookup(data: &Answers, key: &str) -> String {
  data.get(key).map(render_value).unwrap_or_default()
}

/// Strings verbatim, arrays joined with `", "`, `null` as empty.
fn render_value(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
    Value::Array(items) => items
      .iter()
      .map(render_value)
      .collect::<Vec<_>>()
      .join(", "),
  }
}
