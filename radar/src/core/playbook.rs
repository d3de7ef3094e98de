//! Canned strategic content used by the deterministic fallback path.
//!
//! When the generation backend is exhausted, the roadmap and optimization
//! lists come from this fixed pool instead of generated text. The pool is
//! sized to the output contract (3 points x 5 actions, 3 optimizations) and
//! every `task` label is unique by construction, so fallback output always
//! clears the duplication guard.

use crate::core::types::{ImpactLevel, LegalOptimization, StrategicAction, StrategicPoint};

fn action(task: &str, description: &str, implementation: &str) -> StrategicAction {
    StrategicAction {
        task: task.to_string(),
        description: description.to_string(),
        implementation: implementation.to_string(),
    }
}

/// The three strategic pillars with their concrete action steps.
///
/// Ordered by impact: supply chain first (drives credit recovery), then ERP
/// readiness for split payment, then pricing recomposition.
pub fn fallback_roadmap() -> Vec<StrategicPoint> {
    vec![
        StrategicPoint {
            title: "REVISÃO DA CADEIA DE SUPRIMENTOS".to_string(),
            description: "Avaliar se os fornecedores atuais permitem a recuperação \
                          integral dos créditos de IBS/CBS."
                .to_string(),
            impact_level: ImpactLevel::Alto,
            actions: vec![
                action(
                    "Mapear fornecedores estratégicos",
                    "Listar os 20 principais fornecedores por volume de compras anual.",
                    "Extrair o ranking de compras do ERP e consolidar por CNPJ raiz.",
                ),
                action(
                    "Exigir declaração de enquadramento",
                    "Solicitar declaração formal de enquadramento tributário de cada parceiro.",
                    "Enviar formulário padrão distinguindo Simples Nacional de Lucro Real.",
                ),
                action(
                    "Identificar regimes especiais",
                    "Mapear insumos com regimes que reduzem o crédito aproveitável.",
                    "Verificar benefícios como ZFM e isenções na nota fiscal de cada insumo.",
                ),
                action(
                    "Calcular o custo real de aquisição",
                    "Comparar fornecedores informais com fornecedores que geram crédito pleno.",
                    "Simular o preço líquido de crédito para cada cotação antes de fechar pedido.",
                ),
                action(
                    "Homologar fornecedores substitutos",
                    "Iniciar a homologação de parceiros que garantam o repasse integral de créditos.",
                    "Priorizar emitentes de NF-e em conformidade e formalizar o repasse em contrato.",
                ),
            ],
        },
        StrategicPoint {
            title: "ADEQUAÇÃO DO ERP AO SPLIT PAYMENT".to_string(),
            description: "Preparar sistemas e tesouraria para a liquidação do tributo \
                          na própria transação de pagamento."
                .to_string(),
            impact_level: ImpactLevel::Medio,
            actions: vec![
                action(
                    "Consultar o roadmap do ERP",
                    "Verificar com o fornecedor do ERP o cronograma do módulo de split payment.",
                    "Abrir chamado formal e registrar a data prevista de atualização.",
                ),
                action(
                    "Mapear fluxos de caixa",
                    "Identificar o momento exato da segregação do imposto nos recebimentos.",
                    "Desenhar o fluxo atual e o fluxo com retenção automática lado a lado.",
                ),
                action(
                    "Parametrizar o motor fiscal",
                    "Configurar as novas regras de cálculo de IBS/CBS no software.",
                    "Cadastrar alíquota e regras de crédito no motor fiscal e validar com casos de teste.",
                ),
                action(
                    "Testar emissão com retenção",
                    "Realizar testes de emissão de NF-e simulando a liquidação com retenção.",
                    "Emitir notas em homologação e conferir o destaque do tributo retido.",
                ),
                action(
                    "Treinar a conciliação financeira",
                    "Capacitar a equipe na conciliação de extratos com valores líquidos.",
                    "Montar rotina de conciliação que parte do valor líquido recebido por transação.",
                ),
            ],
        },
        StrategicPoint {
            title: "RECOMPOSIÇÃO DA POLÍTICA DE PREÇOS".to_string(),
            description: "Reprecificar o portfólio considerando o imposto destacado \
                          'por fora' e o abatimento de créditos."
                .to_string(),
            impact_level: ImpactLevel::Baixo,
            actions: vec![
                action(
                    "Auditar a precificação atual",
                    "Isolar o imposto 'por dentro' (PIS/COFINS/ICMS/ISS) em cada preço.",
                    "Decompor o preço de cada linha de produto em custo, margem e tributo embutido.",
                ),
                action(
                    "Recalcular o markup",
                    "Rever o markup de todos os SKUs considerando o abatimento dos créditos.",
                    "Aplicar o custo líquido de crédito como base da nova planilha de markup.",
                ),
                action(
                    "Simular preço por fora para B2B",
                    "Apresentar o preço líquido com o tributo destacado para clientes empresariais.",
                    "Gerar propostas com o valor líquido somado à alíquota destacada em linha própria.",
                ),
                action(
                    "Ajustar a comunicação B2C",
                    "Trabalhar a percepção de valor comunicando a transparência da carga tributária.",
                    "Atualizar materiais de venda destacando o imposto visível ao consumidor.",
                ),
                action(
                    "Revisar contratos de fornecimento",
                    "Incluir gatilhos de reajuste baseados na variação da carga líquida.",
                    "Negociar aditivos com cláusula de repactuação atrelada à carga efetiva.",
                ),
            ],
        },
    ]
}

/// Lawful optimization strategies shown when generation is unavailable.
pub fn fallback_optimizations() -> Vec<LegalOptimization> {
    vec![
        LegalOptimization {
            title: "Gestão de Créditos de Insumos".to_string(),
            how_to_implement: "Certificar-se de que 100% dos fornecedores são emitentes \
                               de NF-e e estão em conformidade para repasse de crédito."
                .to_string(),
            benefit_expected: "Redução direta do custo de aquisição na proporção da \
                               alíquota creditável."
                .to_string(),
        },
        LegalOptimization {
            title: "Homologação de Fornecedores com Crédito Pleno".to_string(),
            how_to_implement: "Substituir gradualmente parceiros do Simples por \
                               fornecedores do regime regular que transferem crédito cheio."
                .to_string(),
            benefit_expected: "Aumento do crédito apropriável sem alteração do volume \
                               de compras."
                .to_string(),
        },
        LegalOptimization {
            title: "Gestão de Resíduos e Insumos Indiretos".to_string(),
            how_to_implement: "Formalizar a aquisição de energia, aluguel PJ e telecom \
                               para capturar o crédito sobre custos fixos operacionais."
                .to_string(),
            benefit_expected: "Créditos adicionais sobre despesas hoje fora da base \
                               creditável."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn roadmap_has_three_points_covering_all_levels_in_order() {
        let roadmap = fallback_roadmap();
        assert_eq!(roadmap.len(), 3);
        let levels: Vec<ImpactLevel> = roadmap.iter().map(|p| p.impact_level).collect();
        assert_eq!(levels, ImpactLevel::ALL.to_vec());
    }

    #[test]
    fn every_point_carries_exactly_five_actions() {
        for point in fallback_roadmap() {
            assert_eq!(point.actions.len(), 5, "point {}", point.title);
        }
    }

    #[test]
    fn all_fifteen_task_labels_are_unique_case_insensitively() {
        let tasks: Vec<String> = fallback_roadmap()
            .iter()
            .flat_map(|p| p.actions.iter().map(|a| a.task.to_lowercase()))
            .collect();
        assert_eq!(tasks.len(), 15);
        let unique: HashSet<&String> = tasks.iter().collect();
        assert_eq!(unique.len(), 15);
    }

    #[test]
    fn optimizations_match_fallback_cardinality() {
        assert_eq!(fallback_optimizations().len(), 3);
    }
}
